use proc_macro::TokenStream;
mod opcode;

/// Used on the Opcode enum of the assembler.
///
/// An opcode is an id paired with the class of operand it expects. The assembler
/// looks instructions up by their mnemonic, computes their size in the object
/// stream, and picks the operand grammar to use after the mnemonic from these tables.
///
/// Variants must be unit variants. A variant may carry `#[operand(Kind)]`, where `Kind`
/// is a variant of `OperandKind`, which must be in scope where the enum is defined.
/// Variants without the attribute take no operand (`OperandKind::Bare`).
///
/// This Macro generates the following:
/// * a u16 constant for each variant, named after the variant in SCREAMING_SNAKE_CASE
/// * `Self::ALL`, a slice with every variant in declaration order
/// * `Self::code(&self) -> u16`
/// * `Self::mnemonic(&self) -> &'static str`, the variant name in snake_case
/// * `Self::operand(&self) -> OperandKind`
#[proc_macro_derive(OpCode, attributes(operand))]
pub fn convert(tokens: TokenStream) -> TokenStream {
    opcode::opcode_impl(tokens)
}
