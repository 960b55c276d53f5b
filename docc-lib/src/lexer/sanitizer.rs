use super::{Token, TokenSink};
use crate::core::{Error, Result};
use crate::utils;

/// Groups characters into runs. Carriage returns directly before a line
/// feed are dropped, every other character is kept. After [`finish`] the end
/// token has been delivered exactly once, later calls do nothing.
///
/// [`finish`]: Sanitizer::finish
#[derive(Debug)]
pub struct Sanitizer {
    run: Option<(char, usize)>,
    /// carriage returns not yet known to precede a line feed
    pending_cr: usize,
    finished: bool,
    retry_limit: usize,
}

impl Sanitizer {
    pub fn new(retry_limit: usize) -> Self {
        Self {
            run: None,
            pending_cr: 0,
            finished: false,
            retry_limit,
        }
    }

    pub fn put<S: TokenSink>(&mut self, c: char, sink: &mut S) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if c == '\r' {
            self.pending_cr += 1;
            return Ok(());
        }
        let crs = std::mem::take(&mut self.pending_cr);
        if c != '\n' {
            for _ in 0..crs {
                self.extend('\r', sink)?;
            }
        }
        self.extend(c, sink)
    }

    pub fn finish<S: TokenSink>(&mut self, sink: &mut S) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        for _ in 0..std::mem::take(&mut self.pending_cr) {
            self.extend('\r', sink)?;
        }
        if let Some((value, count)) = self.run.take() {
            self.deliver(Token::new(value, count), sink)?;
        }
        self.finished = true;
        self.deliver(Token::eof(), sink)
    }

    fn extend<S: TokenSink>(&mut self, c: char, sink: &mut S) -> Result<()> {
        if let Some((value, count)) = &mut self.run {
            if *value == c {
                *count += 1;
                return Ok(());
            }
        }
        match self.run.replace((c, 1)) {
            Some((value, count)) => self.deliver(Token::new(value, count), sink),
            None => Ok(()),
        }
    }

    fn deliver<S: TokenSink>(&self, tok: Token, sink: &mut S) -> Result<()> {
        if utils::resubmit(self.retry_limit, || sink.put(&tok))? {
            Ok(())
        } else {
            tracing::error!(?tok, "token was never consumed");
            Err(Error::Livelock(self.retry_limit))
        }
    }
}

/// Runs the whole input through a sanitizer and returns its tokens
pub fn sanitize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut sanitizer = Sanitizer::new(1);
    for c in src.chars() {
        sanitizer.put(c, &mut tokens)?;
    }
    sanitizer.finish(&mut tokens)?;
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(src: &str) -> Vec<(char, usize)> {
        sanitize(src)
            .unwrap()
            .into_iter()
            .filter(|t| !t.eof)
            .map(|t| (t.value, t.count))
            .collect()
    }

    #[test]
    fn test_runs() {
        assert_eq!(
            runs("aab..\n\n"),
            vec![('a', 2), ('b', 1), ('.', 2), ('\n', 2)]
        );
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(runs("a\r\nb"), vec![('a', 1), ('\n', 1), ('b', 1)]);
        assert_eq!(runs("a\r\n\r\n"), vec![('a', 1), ('\n', 2)]);
        assert_eq!(runs("a\rb"), vec![('a', 1), ('\r', 1), ('b', 1)]);
        assert_eq!(runs("a\r"), vec![('a', 1), ('\r', 1)]);
        assert_eq!(runs("a\r\r\nb"), vec![('a', 1), ('\n', 1), ('b', 1)]);
        assert_eq!(runs("\r\rb"), vec![('\r', 2), ('b', 1)]);
    }

    #[test]
    fn test_single_end() {
        let mut tokens = vec![];
        let mut sanitizer = Sanitizer::new(1);
        sanitizer.put('x', &mut tokens).unwrap();
        sanitizer.finish(&mut tokens).unwrap();
        sanitizer.finish(&mut tokens).unwrap();
        sanitizer.put('y', &mut tokens).unwrap();
        assert_eq!(tokens, vec![Token::new('x', 1), Token::eof()]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize("").unwrap(), vec![Token::eof()]);
    }

    struct Stubborn;

    impl TokenSink for Stubborn {
        fn put(&mut self, _tok: &Token) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_livelock() {
        let mut sanitizer = Sanitizer::new(8);
        sanitizer.put('a', &mut Stubborn).unwrap();
        assert!(matches!(
            sanitizer.finish(&mut Stubborn),
            Err(Error::Livelock(8))
        ));
    }
}
