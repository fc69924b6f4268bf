// src/fallback.rs
//! Per-layer strategy selection: AST first, textual fallback.
//!
//! Falling back is an ordinary outcome, reported through `Transformed::warnings`.
//! Only a plugin that genuinely cannot produce a candidate yields an error.

use crate::error::{PluginError, PluginErrorKind};
use crate::lang::Lang;
use crate::layers::{LayerId, LayerRegistry, PluginOutput, SourceTree, TransformContext};
use crate::validator::Validator;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Ast,
    Regex,
    None,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ast => "ast",
            Self::Regex => "regex",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

/// A candidate produced by one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub code: String,
    pub method: Method,
    pub changes: Option<usize>,
    pub improvements: Vec<String>,
    pub warnings: Vec<String>,
}

impl Transformed {
    fn from_output(output: PluginOutput, method: Method, mut warnings: Vec<String>) -> Self {
        warnings.extend(output.warnings);
        Self {
            code: output.code,
            method,
            changes: output.changes,
            improvements: output.improvements,
            warnings,
        }
    }
}

/// Why the AST strategy was abandoned.
enum AstFailure {
    Parse,
    Mutation(PluginErrorKind),
    Rejected(String),
}

impl fmt::Display for AstFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "source did not parse cleanly"),
            Self::Mutation(kind) => write!(f, "{kind}"),
            Self::Rejected(reason) => write!(f, "result rejected ({reason})"),
        }
    }
}

pub struct FallbackController<'a> {
    registry: &'a LayerRegistry,
    validator: &'a Validator,
}

impl<'a> FallbackController<'a> {
    #[must_use]
    pub fn new(registry: &'a LayerRegistry, validator: &'a Validator) -> Self {
        Self {
            registry,
            validator,
        }
    }

    /// Runs layer `layer` over `code`.
    ///
    /// # Errors
    /// Returns a `PluginError` if the layer is unknown, a strategy failed with
    /// no fallback available, or the textual strategy itself failed.
    pub fn execute(
        &self,
        code: &str,
        layer: LayerId,
        use_ast: bool,
        ctx: &TransformContext<'_>,
    ) -> Result<Transformed, PluginError> {
        let (Some(desc), Some(plugin)) = (self.registry.descriptor(layer), self.registry.plugin(layer))
        else {
            return Err(PluginError::new(layer, PluginErrorKind::UnknownLayer));
        };

        let mut warnings = Vec::new();
        let mut ast_failure = None;

        if desc.supports_ast && use_ast {
            match self.try_ast(code, layer, ctx) {
                Ok(Some(done)) => return Ok(done),
                Ok(None) => {}
                Err(failure) => {
                    tracing::debug!(layer, "AST strategy abandoned: {failure}");
                    warnings.push(format!("AST strategy fell back to regex: {failure}"));
                    ast_failure = Some(failure);
                }
            }
        }

        match plugin.regex_transform(code, ctx) {
            Some(Ok(output)) => Ok(Transformed::from_output(output, Method::Regex, warnings)),
            Some(Err(kind)) => Err(PluginError::new(layer, kind)),
            None => Err(match ast_failure {
                Some(AstFailure::Mutation(kind)) => PluginError::new(layer, kind),
                Some(other) => PluginError::unsupported(layer, other.to_string()),
                None => PluginError::unsupported(layer, "plugin offers no usable strategy"),
            }),
        }
    }

    /// `Ok(None)` means the plugin has no AST capability.
    fn try_ast(
        &self,
        code: &str,
        layer: LayerId,
        ctx: &TransformContext<'_>,
    ) -> Result<Option<Transformed>, AstFailure> {
        let Some(plugin) = self.registry.plugin(layer) else {
            return Ok(None);
        };
        let lang = Lang::for_path(ctx.file_path);
        let tree = lang.parse(code).ok_or(AstFailure::Parse)?;
        if tree.root_node().has_error() {
            return Err(AstFailure::Parse);
        }

        let source = SourceTree {
            tree: &tree,
            source: code,
        };
        let output = match plugin.ast_transform(&source, ctx) {
            None => return Ok(None),
            Some(Err(kind)) => return Err(AstFailure::Mutation(kind)),
            Some(Ok(output)) => output,
        };

        let verdict = self.validator.validate_at(code, &output.code, ctx.file_path);
        if !verdict.accept {
            let reason = verdict.reason.unwrap_or_default();
            return Err(AstFailure::Rejected(reason));
        }
        Ok(Some(Transformed::from_output(output, Method::Ast, Vec::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerPlugin, PluginResult};
    use std::sync::Arc;

    struct AstOnlyBroken;
    impl LayerPlugin for AstOnlyBroken {
        fn ast_transform(&self, t: &SourceTree<'_>, _: &TransformContext<'_>) -> Option<PluginResult> {
            // Drops a brace: the pre-check must reject it.
            Some(Ok(PluginOutput::new(t.source.replacen('}', "", 1))))
        }
        fn regex_transform(&self, code: &str, _: &TransformContext<'_>) -> Option<PluginResult> {
            Some(Ok(PluginOutput::new(format!("{code}\n// regex"))))
        }
    }

    struct Nothing;
    impl LayerPlugin for Nothing {}

    struct Throws;
    impl LayerPlugin for Throws {
        fn regex_transform(&self, _: &str, _: &TransformContext<'_>) -> Option<PluginResult> {
            Some(Err(PluginErrorKind::Threw("boom".into())))
        }
    }

    #[test]
    fn rejected_ast_result_falls_back_to_regex() -> Result<(), PluginError> {
        let registry = LayerRegistry::builtin().with_plugin(3, Arc::new(AstOnlyBroken));
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let out = ctl.execute("function a() { return 1; }", 3, true, &TransformContext::default())?;
        assert_eq!(out.method, Method::Regex);
        assert!(out.code.ends_with("// regex"));
        assert!(out.warnings.iter().any(|w| w.contains("fell back")));
        Ok(())
    }

    #[test]
    fn non_ast_layer_goes_straight_to_regex() -> Result<(), PluginError> {
        let registry = LayerRegistry::builtin().with_plugin(2, Arc::new(AstOnlyBroken));
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let out = ctl.execute("function a() { return 1; }", 2, true, &TransformContext::default())?;
        assert_eq!(out.method, Method::Regex);
        assert!(out.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn unparsable_source_falls_back() -> Result<(), PluginError> {
        let registry = LayerRegistry::builtin().with_plugin(3, Arc::new(AstOnlyBroken));
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let out = ctl.execute("function ( {", 3, true, &TransformContext::default())?;
        assert_eq!(out.method, Method::Regex);
        assert!(out.warnings[0].contains("did not parse"));
        Ok(())
    }

    #[test]
    fn no_strategy_is_an_error() {
        let registry = LayerRegistry::builtin().with_plugin(3, Arc::new(Nothing));
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let err = ctl.execute("const a = 1;", 3, true, &TransformContext::default());
        assert!(matches!(
            err,
            Err(PluginError { kind: PluginErrorKind::Unsupported(_), .. })
        ));
    }

    #[test]
    fn regex_failure_is_propagated() {
        let registry = LayerRegistry::builtin().with_plugin(2, Arc::new(Throws));
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let err = ctl.execute("const a = 1;", 2, true, &TransformContext::default());
        assert!(matches!(err, Err(PluginError { layer: 2, .. })));
    }

    #[test]
    fn unknown_layer_is_an_error() {
        let registry = LayerRegistry::builtin();
        let validator = Validator::default();
        let ctl = FallbackController::new(&registry, &validator);
        let err = ctl.execute("x", 42, true, &TransformContext::default());
        assert!(matches!(
            err,
            Err(PluginError { kind: PluginErrorKind::UnknownLayer, .. })
        ));
    }
}
