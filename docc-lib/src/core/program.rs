//! The semantic stack both parsers build their output on

use super::{compiler_bug, Error, Position, Result};
use std::fmt::Debug;

/// A construct that can be under construction on the semantic stack
pub trait Construct: Debug + Sized {
    /// attaches a completed construct that was opened on top of this one
    fn fold(&mut self, child: Self) -> Result<()>;
}

/// A completed top level construct and where it started
#[derive(Debug, Clone, PartialEq)]
pub struct Decl<T> {
    pub node: T,
    pub position: Position,
}

/// Holds the finished declarations and the stack of open constructs.
///
/// Merging the top of the stack either folds it into the construct beneath
/// or, when it is the only one, turns it into a declaration.
#[derive(Debug)]
pub struct Program<T> {
    pub decls: Vec<Decl<T>>,
    stack: Vec<(T, Position)>,
}

impl<T> Default for Program<T> {
    fn default() -> Self {
        Self {
            decls: vec![],
            stack: vec![],
        }
    }
}

impl<T: Construct> Program<T> {
    pub fn open(&mut self, node: T, position: &Position) {
        tracing::trace!(depth = self.stack.len(), ?node, %position, "open");
        self.stack.push((node, position.clone()));
    }

    pub fn top_mut(&mut self) -> Result<&mut T> {
        self.stack
            .last_mut()
            .map(|(node, _)| node)
            .ok_or(Error::StackUnderflow("accessing the open construct"))
    }

    /// Exchanges the open construct for another one
    pub fn replace_top(&mut self, node: T) -> Result<T> {
        let top = self.top_mut()?;
        Ok(std::mem::replace(top, node))
    }

    pub fn merge(&mut self) -> Result<()> {
        let (node, position) = self
            .stack
            .pop()
            .ok_or(Error::StackUnderflow("merging"))?;
        match self.stack.last_mut() {
            Some((parent, _)) => parent.fold(node),
            None => {
                tracing::trace!(%position, ?node, "declaration");
                self.decls.push(Decl { node, position });
                Ok(())
            }
        }
    }

    /// Returns the declarations of a fully parsed input
    pub fn finish(self) -> Result<Vec<Decl<T>>> {
        if !self.stack.is_empty() {
            compiler_bug!(
                "{} constructs are still open at the end of data",
                self.stack.len()
            );
        }
        Ok(self.decls)
    }

    /// Returns what was declared so far and drops the open constructs
    pub fn abandon(self) -> Vec<Decl<T>> {
        if !self.stack.is_empty() {
            tracing::debug!(open = self.stack.len(), "dropping unfinished constructs");
        }
        self.decls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Node(Vec<u32>);

    impl Construct for Node {
        fn fold(&mut self, child: Self) -> Result<()> {
            self.0.extend(child.0);
            Ok(())
        }
    }

    #[test]
    fn test_merge() {
        let mut pos = Position::new("t");
        let mut prog = Program::default();
        prog.open(Node(vec![1]), &pos);
        pos.line = 2;
        prog.open(Node(vec![2, 3]), &pos);
        prog.merge().unwrap();
        assert_eq!(prog.stack.len(), 1);
        assert!(prog.decls.is_empty());
        prog.merge().unwrap();
        let decls = prog.finish().unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].node, Node(vec![1, 2, 3]));
        assert_eq!(decls[0].position.line, 1);
    }

    #[test]
    fn test_underflow() {
        let mut prog = Program::<Node>::default();
        assert!(matches!(
            prog.merge(),
            Err(Error::StackUnderflow(_))
        ));
        assert!(prog.top_mut().is_err());
    }

    #[test]
    fn test_unfinished() {
        let mut prog = Program::default();
        prog.open(Node(vec![]), &Position::new("t"));
        assert!(matches!(prog.finish(), Err(Error::CompilerBug { .. })));
    }
}
