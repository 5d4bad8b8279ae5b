use std::collections::HashSet;

use potion::Error;
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    constants::{SHORT_LINK_LENGTH, SHORT_LINK_MAX_ATTEMPTS},
    error::StatusError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortLinkExhausted {
    pub attempts: usize,
}

impl From<ShortLinkExhausted> for Error {
    fn from(_value: ShortLinkExhausted) -> Self {
        StatusError::unavailable("Could not allocate a short link, try again later").into()
    }
}

pub fn sample_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SHORT_LINK_LENGTH)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect()
}

/// Draws `count` candidate tokens; the caller checks them against the stored ones.
pub fn sample_candidates<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count).map(|_| sample_token(rng)).collect()
}

/// Picks the first candidate not in `taken`. Each candidate is one attempt.
pub fn generate_short_link(
    candidates: Vec<String>,
    taken: &HashSet<String>,
) -> Result<String, ShortLinkExhausted> {
    let attempts = candidates.len();
    for token in candidates {
        if !taken.contains(&token) {
            return Ok(token);
        }
        log::trace!("> Short link {token} already taken");
    }

    log::warn!("Short link space exhausted after {attempts} attempts");
    Err(ShortLinkExhausted { attempts })
}

pub fn default_candidates() -> Vec<String> {
    sample_candidates(&mut rand::thread_rng(), SHORT_LINK_MAX_ATTEMPTS)
}

pub fn short_link_url(base_url: &str, token: &str) -> String {
    format!("{}/s/{}", base_url.trim_end_matches('/'), token)
}

pub fn recipe_page_url(base_url: &str, recipe_id: i32) -> String {
    format!("{}/recipes/{}/", base_url.trim_end_matches('/'), recipe_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn tokens_are_five_alphanumeric_chars() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let token = sample_token(&mut rng);
            assert_eq!(token.len(), SHORT_LINK_LENGTH);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn skips_tokens_already_taken() {
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = sample_candidates(&mut rng, 3);
        let taken: HashSet<String> = candidates[..2].iter().cloned().collect();

        let token = generate_short_link(candidates.clone(), &taken).unwrap();
        assert_eq!(token, candidates[2]);
        assert!(!taken.contains(&token));
    }

    #[test]
    fn gives_up_instead_of_looping() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = sample_candidates(&mut rng, 4);
        let taken: HashSet<String> = candidates.iter().cloned().collect();

        let result = generate_short_link(candidates, &taken);

        assert_eq!(result, Err(ShortLinkExhausted { attempts: 4 }));
    }

    #[test]
    fn never_returns_an_existing_token() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut taken = HashSet::new();

        for _ in 0..500 {
            let candidates = sample_candidates(&mut rng, SHORT_LINK_MAX_ATTEMPTS);
            let token = generate_short_link(candidates, &taken).unwrap();
            assert!(taken.insert(token));
        }
    }

    #[test]
    fn exhausted_generation_is_unavailable() {
        let error: Error = ShortLinkExhausted { attempts: 64 }.into();
        assert!(error.code == 503);
    }

    #[test]
    fn builds_urls_without_double_slashes() {
        assert_eq!(
            short_link_url("http://localhost:8000/", "aB3dE"),
            "http://localhost:8000/s/aB3dE"
        );
        assert_eq!(
            recipe_page_url("http://localhost:8000", 12),
            "http://localhost:8000/recipes/12/"
        );
    }
}
