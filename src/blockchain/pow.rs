use sha2::{Digest, Sha256};

/// Number of leading hexadecimal zeros a proof hash must carry
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Proof of work puzzle: find `p'` such that `sha256("{p}{p'}")` starts with
/// `difficulty` zeros, where `p` is the previous block's proof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        ProofOfWork::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Creates a puzzle with the given difficulty (capped at the digest length)
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork {
            difficulty: difficulty.min(64),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Validates the proof: does `hash(last_proof, proof)` carry enough leading zeros?
    pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        let guess_hash = hex::encode(Sha256::digest(guess.as_bytes()));

        guess_hash.bytes().take(self.difficulty).all(|b| b == b'0')
    }

    /// Finds the smallest proof valid against `last_proof`
    ///
    /// The search is unbounded; at the default difficulty it takes around
    /// 65536 attempts on average.
    pub fn find_proof(&self, last_proof: u64) -> u64 {
        let mut proof = 0;
        while !self.valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Same as [`ProofOfWork::find_proof`] but gives up after `max_attempts` candidates
    #[cfg(test)]
    pub fn find_proof_within(&self, last_proof: u64, max_attempts: u64) -> Option<u64> {
        (0..max_attempts).find(|&proof| self.valid_proof(last_proof, proof))
    }
}
