//! The docscript syntax tree: constants and method calls.
//!
//! Vector methods carry an ordered argument list, map methods a linked list
//! of named parameters. Every node knows how many assembly lines the
//! generator will produce for it.

use super::registry::{self, Descriptor, Style};
use crate::core::{compiler_bug, Color, Construct, Result, Symbol, SymbolKind, Timestamp};
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    String(String),
    Bool(bool),
    Uint(u64),
    Int(i64),
    Float(OrderedFloat<f64>),
    Timestamp(Timestamp),
    Color(Color),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    /// the source text
    pub literal: String,
    pub payload: Payload,
}

impl Constant {
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            payload: Payload::String(text.clone()),
            literal: text,
        }
    }

    /// Converts a value symbol. Anything that fails to parse as its kind
    /// stays a string.
    pub fn from_symbol(sym: &Symbol) -> Self {
        let text = sym.text.as_str();
        let payload = match sym.kind {
            SymbolKind::Number => text.parse().ok().map(Payload::Uint),
            SymbolKind::Signed => text.parse().ok().map(Payload::Int),
            SymbolKind::Float => text.parse().ok().map(|f| Payload::Float(OrderedFloat(f))),
            SymbolKind::Bool => text.parse().ok().map(Payload::Bool),
            SymbolKind::Timestamp => Timestamp::parse(text).map(Payload::Timestamp),
            SymbolKind::Color => Color::parse(text).map(Payload::Color),
            _ => None,
        };
        Self {
            literal: sym.text.clone(),
            payload: payload.unwrap_or_else(|| Payload::String(sym.text.clone())),
        }
    }

    /// the marks that attach to the word before them
    pub fn is_punctuation(&self) -> bool {
        matches!(&self.payload, Payload::String(s) if matches!(s.as_str(), "." | "," | ";" | "?" | "!"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Constant(Constant),
    Method(Box<Method>),
}

impl Value {
    pub fn size(&self) -> usize {
        match self {
            Value::Constant(_) => 1,
            Value::Method(m) => m.size(),
        }
    }

    fn is_punctuation(&self) -> bool {
        matches!(self, Value::Constant(c) if c.is_punctuation())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Vec(VecMethod),
    Map(MapMethod),
}

impl Method {
    /// Opens a call of `name`, shaped by its descriptor. Unknown names
    /// become inline vector methods.
    pub fn new(name: &str, descriptor: Option<&'static Descriptor>) -> Self {
        match descriptor {
            Some(d) if d.style == Style::Map => Method::Map(MapMethod {
                name: name.to_owned(),
                descriptor,
                params: None,
            }),
            _ => Method::Vec(VecMethod {
                name: name.to_owned(),
                descriptor,
                args: vec![],
            }),
        }
    }

    pub fn call(name: &str) -> Self {
        Self::new(name, registry::lookup_method(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Method::Vec(v) => &v.name,
            Method::Map(m) => &m.name,
        }
    }

    pub fn append(&mut self, value: Value) -> Result<()> {
        match self {
            Method::Vec(v) => {
                v.args.push(value);
                Ok(())
            }
            Method::Map(m) => m.append(value),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Method::Vec(v) => v.size(),
            Method::Map(m) => m.size(),
        }
    }
}

impl Construct for Method {
    fn fold(&mut self, child: Self) -> Result<()> {
        self.append(Value::Method(Box::new(child)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecMethod {
    pub name: String,
    pub descriptor: Option<&'static Descriptor>,
    pub args: Vec<Value>,
}

impl VecMethod {
    /// an argument-less paragraph, the generator leaves it out
    pub fn is_vacuous(&self) -> bool {
        self.name == registry::PARAGRAPH && self.args.is_empty()
    }

    /// Attaches every punctuation mark that is not the first argument to
    /// the argument before it, as `cat(previous, mark)`. A run of marks
    /// nests: `a ? !` becomes `cat(cat(a, ?), !)`.
    pub fn coalesce_punctuation(&mut self) {
        let args = std::mem::take(&mut self.args);
        for arg in args {
            match self.args.pop() {
                Some(previous) if arg.is_punctuation() => {
                    let cat = VecMethod {
                        name: registry::CAT.to_owned(),
                        descriptor: registry::lookup_method(registry::CAT),
                        args: vec![previous, arg],
                    };
                    self.args.push(Value::Method(Box::new(Method::Vec(cat))));
                }
                previous => {
                    self.args.extend(previous);
                    self.args.push(arg);
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        if self.is_vacuous() {
            return 0;
        }
        // esba, frm, make_vector, push 1, invoke_r, pull
        6 + self.args.iter().map(Value::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapMethod {
    pub name: String,
    pub descriptor: Option<&'static Descriptor>,
    pub params: Option<Box<Param>>,
}

impl MapMethod {
    pub fn add_key(&mut self, key: &str) {
        let param = Param::new(key);
        match self.params.as_deref_mut() {
            Some(params) => params.push(param),
            None => self.params = Some(Box::new(param)),
        }
    }

    /// Completes the most recently added parameter. A quoted value is
    /// stored as a `range`, the words `true` and `false` as booleans.
    pub fn append(&mut self, value: Value) -> Result<()> {
        let value = match value {
            Value::Method(mut m) => {
                if let Method::Vec(v) = m.as_mut() {
                    if v.name == registry::QUOTE {
                        v.name = registry::RANGE.to_owned();
                        v.descriptor = registry::lookup_method(registry::RANGE);
                    }
                }
                Value::Method(m)
            }
            Value::Constant(mut c) => {
                if matches!(c.payload, Payload::String(_)) {
                    match c.literal.as_str() {
                        "true" => c.payload = Payload::Bool(true),
                        "false" => c.payload = Payload::Bool(false),
                        _ => {}
                    }
                }
                Value::Constant(c)
            }
        };
        let Some(params) = self.params.as_mut() else {
            compiler_bug!("a value for '{}' arrived without a pending key", self.name);
        };
        if !params.finish(value) {
            compiler_bug!("a value for '{}' arrived without a pending key", self.name);
        }
        Ok(())
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        std::iter::successors(self.params.as_deref(), |p| p.next.as_deref())
    }

    /// the required parameters of the descriptor that were never named
    pub fn missing_params(&self) -> Vec<&'static str> {
        let required: &[&'static str] = match self.descriptor {
            Some(d) => d.required,
            None => &[],
        };
        required
            .iter()
            .copied()
            .filter(|name| !self.params().any(|p| p.key == *name))
            .collect()
    }

    /// Gives every parameter without a value an empty string and returns
    /// their keys
    pub fn fill_empty_params(&mut self) -> Vec<String> {
        let mut filled = vec![];
        let mut next = self.params.as_deref_mut();
        while let Some(param) = next {
            if param.value.is_none() {
                param.value = Some(Value::Constant(Constant::string("")));
                filled.push(param.key.clone());
            }
            next = param.next.as_deref_mut();
        }
        filled
    }

    pub fn size(&self) -> usize {
        // push count, make_param_map, push 1, invoke_r
        4 + self.params().map(Param::size).sum::<usize>()
    }
}

/// One named parameter and the rest of the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: Option<Value>,
    pub next: Option<Box<Param>>,
}

impl Param {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            value: None,
            next: None,
        }
    }

    fn push(&mut self, param: Param) {
        match self.next.as_deref_mut() {
            Some(next) => next.push(param),
            None => self.next = Some(Box::new(param)),
        }
    }

    /// Sets the value of the last parameter, `false` if it already has one
    pub fn finish(&mut self, value: Value) -> bool {
        match self.next.as_deref_mut() {
            Some(next) => next.finish(value),
            None if self.value.is_none() => {
                self.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        std::iter::successors(Some(self), |p| p.next.as_deref()).all(|p| p.value.is_some())
    }

    pub fn size(&self) -> usize {
        // push "key", make_param
        2 + self.value.as_ref().map_or(1, Value::size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Value {
        Value::Constant(Constant::string(s))
    }

    fn cat(a: Value, b: Value) -> Value {
        Value::Method(Box::new(Method::Vec(VecMethod {
            name: "cat".into(),
            descriptor: registry::lookup_method("cat"),
            args: vec![a, b],
        })))
    }

    #[test]
    fn test_coalesce() {
        let mut p = VecMethod {
            name: "paragraph".into(),
            descriptor: registry::lookup_method("paragraph"),
            args: vec![text("."), text("hello"), text("world"), text("?"), text("!")],
        };
        p.coalesce_punctuation();
        assert_eq!(
            p.args,
            vec![
                text("."),
                text("hello"),
                cat(cat(text("world"), text("?")), text("!")),
            ]
        );
    }

    #[test]
    fn test_colon_is_not_coalesced() {
        let mut p = VecMethod {
            name: "paragraph".into(),
            descriptor: None,
            args: vec![text("note"), text(":")],
        };
        p.coalesce_punctuation();
        assert_eq!(p.args.len(), 2);
    }

    #[test]
    fn test_params() {
        let Method::Map(mut link) = Method::call("link") else {
            panic!("link is a map method");
        };
        link.add_key("text");
        link.append(text("here")).unwrap();
        link.add_key("url");
        assert!(!link.params.as_ref().unwrap().is_complete());
        assert_eq!(link.missing_params(), Vec::<&str>::new());
        assert_eq!(link.fill_empty_params(), vec!["url".to_owned()]);
        assert!(link.params.as_ref().unwrap().is_complete());
        let keys: Vec<_> = link.params().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["text", "url"]);
    }

    #[test]
    fn test_map_value_conversions() {
        let Method::Map(mut m) = Method::call("meta") else {
            panic!("meta is a map method");
        };
        m.add_key("draft");
        m.append(text("true")).unwrap();
        m.add_key("title");
        let mut quote = Method::call("quote");
        quote.append(text("x")).unwrap();
        m.append(Value::Method(Box::new(quote))).unwrap();

        let values: Vec<_> = m.params().map(|p| p.value.clone().unwrap()).collect();
        assert!(matches!(
            &values[0],
            Value::Constant(Constant { payload: Payload::Bool(true), .. })
        ));
        match &values[1] {
            Value::Method(m) => assert_eq!(m.name(), "range"),
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn test_value_without_key() {
        let mut m = Method::call("ref");
        assert!(m.append(text("x")).is_err());
    }

    #[test]
    fn test_sizes() {
        let mut h1 = Method::call("h1");
        h1.append(text("Title")).unwrap();
        assert_eq!(h1.size(), 7);

        let empty = Method::call("paragraph");
        assert_eq!(empty.size(), 0);

        let Method::Map(mut r) = Method::call("ref") else {
            panic!("ref is a map method");
        };
        r.add_key("id");
        r.append(text("intro")).unwrap();
        assert_eq!(r.size(), 7);
    }

    #[test]
    fn test_unknown_names_are_inline_vectors() {
        let m = Method::call("frobnicate");
        assert!(matches!(m, Method::Vec(_)));
    }
}
