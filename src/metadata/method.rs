use bitflags::bitflags;

use crate::{
    analysis::cfg::{CfgOptions, ControlFlowGraph},
    assembly::{CalleeDescriptor, CalleeResolver, MethodBody},
    metadata::{
        parameter::{ParameterCollection, ParameterDefinition},
        token::Token,
    },
    Error, Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flags of a method signature's calling convention byte (ECMA-335 §II.23.2.1)
    pub struct CallingConvention: u8 {
        /// Generic method, a generic parameter count follows
        const GENERIC = 0x10;
        /// Instance method, an implicit `this` is passed
        const HAS_THIS = 0x20;
        /// `this` is passed explicitly as the first parameter
        const EXPLICIT_THIS = 0x40;
    }
}

/// A method as seen by the analysis layer: signature shape, parameters and optional body.
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::prelude::*;
///
/// let mut method = MethodDefinition::new(Token::new(0x0600_0001), "Add", CallingConvention::HAS_THIS, false);
/// method.add_parameter(ParameterDefinition::new("a"));
/// method.add_parameter(ParameterDefinition::new("b"));
///
/// let callee = method.callee_descriptor();
/// assert_eq!(callee.parameter_count, 2);
/// assert!(callee.has_this);
/// ```
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Metadata token of the method
    pub token: Token,
    /// Method name
    pub name: String,
    /// Signature calling convention
    pub calling_convention: CallingConvention,
    /// The return type is `void`
    pub returns_void: bool,
    parameters: ParameterCollection,
    body: Option<MethodBody>,
}

impl MethodDefinition {
    /// Create a method without parameters and without a body.
    #[must_use]
    pub fn new(
        token: Token,
        name: impl Into<String>,
        calling_convention: CallingConvention,
        returns_void: bool,
    ) -> Self {
        MethodDefinition {
            token,
            name: name.into(),
            calling_convention,
            returns_void,
            parameters: ParameterCollection::for_method(token),
            body: None,
        }
    }

    /// Returns `true` for instance methods.
    #[must_use]
    pub fn has_this(&self) -> bool {
        self.calling_convention.contains(CallingConvention::HAS_THIS)
    }

    /// The declared parameters, excluding `this`.
    #[must_use]
    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    /// Mutable access to the parameter list; ownership and indices are kept in sync.
    pub fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    /// Append a parameter.
    pub fn add_parameter(&mut self, parameter: ParameterDefinition) {
        self.parameters.add(parameter);
    }

    /// The method body, if the method has one.
    #[must_use]
    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    /// Attach a body.
    pub fn set_body(&mut self, body: MethodBody) {
        self.body = Some(body);
    }

    /// Decode `il` and attach it as this method's body, resolving calls through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns any decoding error from [`crate::assembly::MethodBody::decode`].
    pub fn decode_body<R>(&mut self, il: &[u8], resolver: &R) -> Result<()>
    where
        R: CalleeResolver + ?Sized,
    {
        self.body = Some(MethodBody::decode(il, self.returns_void, resolver)?);
        Ok(())
    }

    /// The call shape other methods see when invoking this one.
    ///
    /// With `EXPLICIT_THIS` the receiver is already part of the declared parameters, so no
    /// implicit `this` is reported.
    #[must_use]
    pub fn callee_descriptor(&self) -> CalleeDescriptor {
        let parameter_count = u32::try_from(self.parameters.len()).unwrap_or(u32::MAX);
        let has_this = self.has_this()
            && !self
                .calling_convention
                .contains(CallingConvention::EXPLICIT_THIS);
        CalleeDescriptor::new(parameter_count, has_this, self.returns_void)
    }

    /// Build the control flow graph of this method's body.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::MissingBody`] if the method has no body
    /// - Any build error from [`crate::analysis::cfg::ControlFlowGraph::build`]
    pub fn cfg(&self, options: CfgOptions) -> Result<ControlFlowGraph<'_>> {
        let body = self.body.as_ref().ok_or(Error::MissingBody(self.token))?;
        ControlFlowGraph::build(body, options)
    }
}

impl CalleeResolver for [MethodDefinition] {
    fn resolve_callee(&self, token: Token) -> Option<CalleeDescriptor> {
        self.iter()
            .find(|method| method.token == token)
            .map(MethodDefinition::callee_descriptor)
    }
}

impl CalleeResolver for Vec<MethodDefinition> {
    fn resolve_callee(&self, token: Token) -> Option<CalleeDescriptor> {
        self.as_slice().resolve_callee(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(row: u32, convention: CallingConvention, parameters: &[&str]) -> MethodDefinition {
        let mut method = MethodDefinition::new(
            Token::from_parts(Token::METHOD_DEF, row),
            format!("M{row}"),
            convention,
            true,
        );
        for name in parameters {
            method.add_parameter(ParameterDefinition::new(*name));
        }
        method
    }

    #[test]
    fn callee_descriptor() {
        let instance = method(1, CallingConvention::HAS_THIS, &["a", "b"]);
        assert_eq!(instance.callee_descriptor(), CalleeDescriptor::new(2, true, true));

        let explicit = method(
            2,
            CallingConvention::HAS_THIS | CallingConvention::EXPLICIT_THIS,
            &["self"],
        );
        assert_eq!(explicit.callee_descriptor(), CalleeDescriptor::new(1, false, true));

        let stat = method(3, CallingConvention::empty(), &[]);
        assert!(!stat.has_this());
        assert!(stat.parameters().is_empty());
    }

    #[test]
    fn parameters_are_owned() {
        let instance = method(7, CallingConvention::HAS_THIS, &["a", "b"]);
        assert!(instance
            .parameters()
            .iter()
            .all(|p| p.method() == Some(instance.token)));
        assert_eq!(instance.parameters()[1].index(), Some(1));
    }

    #[test]
    fn resolver_over_slice() {
        let methods = vec![
            method(1, CallingConvention::HAS_THIS, &["a"]),
            method(2, CallingConvention::empty(), &["a", "b", "c"]),
        ];
        let callee = methods.resolve_callee(Token::from_parts(Token::METHOD_DEF, 2));
        assert_eq!(callee, Some(CalleeDescriptor::new(3, false, true)));
        assert_eq!(methods.resolve_callee(Token::new(0x0600_0009)), None);
    }

    #[test]
    fn cfg_requires_body() {
        let mut m = method(1, CallingConvention::empty(), &[]);
        assert!(matches!(
            m.cfg(CfgOptions::default()),
            Err(Error::MissingBody(token)) if token == m.token
        ));

        m.decode_body(&[0x00, 0x2A], &()).unwrap();
        let cfg = m.cfg(CfgOptions::full()).unwrap();
        assert_eq!(cfg.block_count(), 1);
    }
}
