//! Hygienic template substitution.
//!
//! Placeholders are filled from a match's bindings. Names the template
//! introduces (`{{@name}}`) are made safe for the target notation, checked
//! against every name already in use and get the first free numeric suffix
//! (`name_1`, `name_2`, ...).
//! Multi-line values are re-indented to the column of their placeholder.

use crate::matcher::{Binding, Bindings};
use rosetta_catalog::{Segment, Template};
use rosetta_ir::NodeId;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// A placeholder with no binding and no default.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template placeholder {{{{{placeholder}}}}} has no binding")]
pub struct TemplateBindingError {
    pub placeholder: String,
}

/// Renders bound IR nodes into target text.
pub trait BindingRenderer {
    /// One node, in its own syntactic position (statement or expression).
    fn render_node(&mut self, id: &NodeId) -> String;
    /// A statement list, one statement per line.
    fn render_statements(&mut self, ids: &[NodeId]) -> String;
    /// A comma separated argument list.
    fn render_args(&mut self, ids: &[NodeId]) -> String;
    /// Text for an empty statement list.
    fn empty_body(&self) -> &'static str;
    /// A name the template introduces, as the target can spell it.
    fn ident(&self, name: &str) -> String;
}

/// Names in use in a unit. Grows as templates introduce names.
#[derive(Debug, Clone, Default)]
pub struct NameScope {
    taken: HashSet<String>,
}

impl NameScope {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: names.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Claim `base`, or the first `base_N` that is free.
    pub fn claim(&mut self, base: &str, also_avoid: &HashSet<&str>) -> String {
        let free = |name: &str| !self.taken.contains(name) && !also_avoid.contains(name);
        let name = if free(base) {
            base.to_string()
        } else {
            (1..)
                .map(|n| format!("{base}_{n}"))
                .find(|candidate| free(candidate))
                .unwrap_or_else(|| base.to_string())
        };
        self.taken.insert(name.clone());
        name
    }
}

/// Bindings as a template sees them once its parameter renames apply:
/// each renamed placeholder reads the binding it names, or nothing.
pub fn with_parameters<'b>(
    bindings: &'b Bindings,
    parameters: &BTreeMap<String, String>,
) -> Cow<'b, Bindings> {
    if parameters.is_empty() {
        return Cow::Borrowed(bindings);
    }
    let mut renamed = bindings.clone();
    for (placeholder, source) in parameters {
        match bindings.get(source) {
            Some(binding) => {
                renamed.insert(placeholder.clone(), binding.clone());
            }
            None => {
                renamed.remove(placeholder);
            }
        }
    }
    Cow::Owned(renamed)
}

/// Names chosen for a template's `{{@name}}` placeholders.
pub type FreshNames = BTreeMap<String, String>;

/// Fill `template` from `bindings`.
pub fn substitute(
    template: &Template,
    bindings: &Bindings,
    scope: &mut NameScope,
    renderer: &mut dyn BindingRenderer,
) -> Result<String, TemplateBindingError> {
    let fresh = claim_fresh_names(template, bindings, scope, |name| renderer.ident(name))?;
    Ok(instantiate(template, bindings, &fresh, renderer))
}

/// Check every placeholder is bound, then claim the template's fresh
/// names, each passed through `ident` first. Nothing is claimed when a
/// binding is missing.
pub fn claim_fresh_names(
    template: &Template,
    bindings: &Bindings,
    scope: &mut NameScope,
    ident: impl Fn(&str) -> String,
) -> Result<FreshNames, TemplateBindingError> {
    for segment in template.segments() {
        if let Segment::Placeholder { name, default: None } = segment
            && !bindings.contains_key(name)
        {
            return Err(TemplateBindingError {
                placeholder: name.clone(),
            });
        }
    }

    let bound_text: HashSet<&str> = bindings.values().filter_map(Binding::as_text).collect();
    let mut fresh = FreshNames::new();
    for name in template.fresh_names() {
        if !fresh.contains_key(name) {
            let claimed = scope.claim(&ident(name), &bound_text);
            fresh.insert(name.to_string(), claimed);
        }
    }
    Ok(fresh)
}

/// Render the template text. Placeholders without a binding take their
/// default, or nothing.
pub fn instantiate(
    template: &Template,
    bindings: &Bindings,
    fresh: &FreshNames,
    renderer: &mut dyn BindingRenderer,
) -> String {
    let mut out = String::new();
    for segment in template.segments() {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Fresh(name) => {
                if let Some(claimed) = fresh.get(name) {
                    out.push_str(claimed);
                }
            }
            Segment::Placeholder { name, default } => {
                let value = match (bindings.get(name), default) {
                    (Some(binding), _) => render(binding, renderer),
                    (None, Some(default)) => default.clone(),
                    (None, None) => String::new(),
                };
                push_indented(&mut out, &value);
            }
        }
    }
    out
}

fn render(binding: &Binding, renderer: &mut dyn BindingRenderer) -> String {
    match binding {
        Binding::Text(text) => text.clone(),
        Binding::Node(id) => renderer.render_node(id),
        Binding::Nodes(ids) if ids.is_empty() => renderer.empty_body().to_string(),
        Binding::Nodes(ids) => renderer.render_statements(ids),
        Binding::Args(ids) => renderer.render_args(ids),
    }
}

/// Append `value`, indenting continuation lines to the current line's
/// leading whitespace.
fn push_indented(out: &mut String, value: &str) {
    let line_start = out.rfind('\n').map_or(0, |i| i + 1);
    let indent: String = out[line_start..]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect();

    for (i, line) in value.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
}
