//! contains small utility functions that have nowhere else to go

use crate::core::Result;

/// returns the crate version
pub fn get_version() -> [u16; 3] {
    let version_str = env!("CARGO_PKG_VERSION");
    let mut parts = version_str.split('.').map(|x| x.parse::<u16>().unwrap_or(0));
    [
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    ]
}

/// Offers the same input to a consumer until it reports the input as
/// consumed. Returns `false` if that did not happen within `limit` attempts.
pub fn resubmit<F>(limit: usize, mut attempt: F) -> Result<bool>
where
    F: FnMut() -> Result<bool>,
{
    for _ in 0..limit.max(1) {
        if attempt()? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resubmit() {
        let mut calls = 0;
        let consumed = resubmit(5, || {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();
        assert!(consumed);
        assert_eq!(calls, 3);

        assert!(!resubmit(4, || Ok(false)).unwrap());
    }
}
