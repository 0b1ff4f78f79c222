//! The resolved counterpart of [`crate::scan::ScannedFeature`].
//!
//! Every resolved feature carries a `kinds` set and an `identifiers` set
//! (primary name plus aliases): a span, the feature's own data, and plain
//! accessor methods, dispatched on tag rather than a concrete variant match
//! at the query layer.

use std::sync::Arc;

use crate::diagnostic::SourceRange;
use crate::diagnostic::Warning;
use crate::scan::ScannedBehavior;
use crate::scan::ScannedDomModule;
use crate::scan::ScannedElement;
use crate::scan::ScannedFunction;
use crate::scan::ScannedImport;
use crate::scan::ScannedNamespace;
use crate::scan::ScannedPolymerElement;
use crate::scan::ScannedReference;

/// An import edge, resolved to the URL it targets.
#[derive(Debug, Clone)]
pub struct Import {
    /// The import's type tag (see [`ScannedImport::kind`]).
    pub kind: &'static str,
    /// The resolved target URL.
    pub url: Arc<url::Url>,
    /// Where the import statement/tag itself appears.
    pub source_range: SourceRange,
}

/// A plain custom element tag with no Polymer registration behind it.
#[derive(Debug, Clone)]
pub struct Element {
    /// The tag name.
    pub tag_name: String,
    /// Attached documentation, if any.
    pub doc: Option<String>,
    /// Where the element is declared.
    pub source_range: SourceRange,
}

/// A resolved behavior assignment within a [`PolymerElement`].
#[derive(Debug, Clone)]
pub struct BehaviorAssignment {
    /// The behavior's identifier as written.
    pub name: String,
    /// The resolved behavior, if the identifier matched one in scope.
    pub behavior: Option<Arc<Behavior>>,
}

/// A Polymer-style element, resolved with its behaviors flattened.
#[derive(Debug, Clone)]
pub struct PolymerElement {
    /// The tag name this element registers under.
    pub tag_name: String,
    /// The class name, if the registration used a class expression.
    pub class_name: Option<String>,
    /// Property names declared on the element.
    pub properties: Vec<String>,
    /// Behaviors this element was assigned, in flattened (transitively
    /// included), deduplicated order, each possibly unresolved.
    pub behaviors: Vec<BehaviorAssignment>,
    /// Attached documentation, if any.
    pub doc: Option<String>,
    /// Where the element is declared.
    pub source_range: SourceRange,
}

/// A `Polymer.Behavior`-style mixin declaration.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// The behavior's dotted identifier.
    pub name: String,
    /// Where the behavior is declared.
    pub source_range: SourceRange,
}

/// A namespace object.
#[derive(Debug, Clone)]
pub struct Namespace {
    /// The namespace's dotted name.
    pub name: String,
    /// Where the namespace is declared.
    pub source_range: SourceRange,
}

/// A top-level function declaration.
#[derive(Debug, Clone)]
pub struct Function {
    /// The function's name.
    pub name: String,
    /// Where the function is declared.
    pub source_range: SourceRange,
}

/// A resolved reference: an identifier use linked to its target, if the
/// target could be found unambiguously.
#[derive(Debug, Clone)]
pub struct Reference {
    /// The identifier text.
    pub identifier: String,
    /// The resolved target's primary identifier, when resolution succeeded.
    pub resolved_identifier: Option<String>,
    /// Where the reference appears.
    pub source_range: SourceRange,
}

/// A `<dom-module>` element.
#[derive(Debug, Clone)]
pub struct DomModule {
    /// The `id` attribute.
    pub id: Option<String>,
    /// Where the element is declared.
    pub source_range: SourceRange,
}

/// The resolved counterpart of [`crate::scan::ScannedFeature`].
#[derive(Debug, Clone)]
pub enum Feature {
    /// See [`Import`].
    Import(Import),
    /// See [`Element`].
    Element(Element),
    /// See [`PolymerElement`].
    PolymerElement(PolymerElement),
    /// See [`Behavior`].
    Behavior(Behavior),
    /// See [`Namespace`].
    Namespace(Namespace),
    /// See [`Function`].
    Function(Function),
    /// See [`Reference`].
    Reference(Reference),
    /// See [`DomModule`].
    DomModule(DomModule),
}

impl Feature {
    /// The set of string tags this feature answers to.
    pub fn kinds(&self) -> &'static [&'static str] {
        match self {
            Self::Import(_) => &["import"],
            Self::Element(_) => &["element"],
            Self::PolymerElement(_) => &["element", "polymer-element"],
            Self::Behavior(_) => &["behavior"],
            Self::Namespace(_) => &["namespace"],
            Self::Function(_) => &["function"],
            Self::Reference(_) => &["reference"],
            Self::DomModule(_) => &["dom-module"],
        }
    }

    /// The primary identifier plus any aliases this feature is retrievable
    /// by via `get_by_id`/`get_only_at_id`.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            Self::Import(f) => vec![f.url.as_str()],
            Self::Element(f) => vec![f.tag_name.as_str()],
            Self::PolymerElement(f) => {
                let mut ids = vec![f.tag_name.as_str()];
                if let Some(class_name) = &f.class_name {
                    ids.push(class_name.as_str());
                }
                ids
            }
            Self::Behavior(f) => vec![f.name.as_str()],
            Self::Namespace(f) => vec![f.name.as_str()],
            Self::Function(f) => vec![f.name.as_str()],
            Self::Reference(f) => vec![f.identifier.as_str()],
            Self::DomModule(f) => f.id.as_deref().into_iter().collect(),
        }
    }

    /// The feature's source range.
    pub fn source_range(&self) -> &SourceRange {
        match self {
            Self::Import(f) => &f.source_range,
            Self::Element(f) => &f.source_range,
            Self::PolymerElement(f) => &f.source_range,
            Self::Behavior(f) => &f.source_range,
            Self::Namespace(f) => &f.source_range,
            Self::Function(f) => &f.source_range,
            Self::Reference(f) => &f.source_range,
            Self::DomModule(f) => &f.source_range,
        }
    }
}

/// Resolves a [`ScannedElement`] into an [`Element`] feature. Cannot fail.
pub fn resolve_element(scanned: &ScannedElement, source_range: SourceRange) -> Feature {
    Feature::Element(Element {
        tag_name: scanned.tag_name.clone(),
        doc: scanned.doc.clone(),
        source_range,
    })
}

/// Resolves a [`ScannedPolymerElement`], looking up each behavior
/// assignment in `behaviors_by_name` and recursively flattening any
/// behavior-of-a-behavior composition, deduplicating by name.
///
/// Returns the resolved feature plus any warnings raised for unresolved
/// behavior names (§4.6: "emit a warning for any unresolved behavior
/// name").
pub fn resolve_polymer_element(
    scanned: &ScannedPolymerElement,
    source_range: SourceRange,
    behaviors_by_name: &std::collections::HashMap<String, Arc<Behavior>>,
) -> (Feature, Vec<Warning>) {
    let mut warnings = Vec::new();
    let behaviors = get_behaviors(
        &scanned.behavior_assignments,
        behaviors_by_name,
        &mut std::collections::HashSet::new(),
        &source_range,
        &mut warnings,
    );

    let feature = Feature::PolymerElement(PolymerElement {
        tag_name: scanned.tag_name.clone(),
        class_name: scanned.class_name.clone(),
        properties: scanned.properties.clone(),
        behaviors,
        doc: scanned.doc.clone(),
        source_range,
    });

    (feature, warnings)
}

/// Recursively flattens a behavior assignment list, deduplicating by
/// behavior identity (name) and emitting a warning for each name that
/// doesn't resolve.
fn get_behaviors(
    names: &[String],
    behaviors_by_name: &std::collections::HashMap<String, Arc<Behavior>>,
    seen: &mut std::collections::HashSet<String>,
    source_range: &SourceRange,
    warnings: &mut Vec<Warning>,
) -> Vec<BehaviorAssignment> {
    let mut out = Vec::new();

    for name in names {
        if !seen.insert(name.clone()) {
            continue;
        }

        match behaviors_by_name.get(name) {
            Some(behavior) => out.push(BehaviorAssignment {
                name: name.clone(),
                behavior: Some(behavior.clone()),
            }),
            None => {
                warnings.push(Warning::error(
                    "behavior-not-recognized",
                    format!("behavior `{name}` is not recognized"),
                    source_range.clone(),
                ));
                out.push(BehaviorAssignment {
                    name: name.clone(),
                    behavior: None,
                });
            }
        }
    }

    out
}

/// Resolves a [`ScannedBehavior`]. Cannot fail.
pub fn resolve_behavior(scanned: &ScannedBehavior, source_range: SourceRange) -> Feature {
    Feature::Behavior(Behavior {
        name: scanned.name.clone(),
        source_range,
    })
}

/// Resolves a [`ScannedNamespace`]. Cannot fail.
pub fn resolve_namespace(scanned: &ScannedNamespace, source_range: SourceRange) -> Feature {
    Feature::Namespace(Namespace {
        name: scanned.name.clone(),
        source_range,
    })
}

/// Resolves a [`ScannedFunction`]. Cannot fail.
pub fn resolve_function(scanned: &ScannedFunction, source_range: SourceRange) -> Feature {
    Feature::Function(Function {
        name: scanned.name.clone(),
        source_range,
    })
}

/// Resolves a [`ScannedDomModule`]. Cannot fail.
pub fn resolve_dom_module(scanned: &ScannedDomModule, source_range: SourceRange) -> Feature {
    Feature::DomModule(DomModule {
        id: scanned.id.clone(),
        source_range,
    })
}

/// Resolves a [`ScannedImport`] to its target URL.
pub fn resolve_import(scanned: &ScannedImport, url: Arc<url::Url>, source_range: SourceRange) -> Feature {
    Feature::Import(Import {
        kind: scanned.kind,
        url,
        source_range,
    })
}

/// Resolves a [`ScannedReference`] by looking it up with `get_only_at_id`
/// semantics against a candidate identifier set. Ambiguous or missing
/// lookups yield an unresolved reference plus a warning, per §4.6.
pub fn resolve_reference(
    scanned: &ScannedReference,
    source_range: SourceRange,
    candidates: Option<&str>,
) -> (Feature, Vec<Warning>) {
    let mut warnings = Vec::new();
    let resolved_identifier = candidates.map(str::to_string);

    if resolved_identifier.is_none() {
        warnings.push(Warning::new(
            "could-not-resolve-reference",
            format!("could not resolve reference to `{}`", scanned.identifier),
            crate::diagnostic::Severity::Warning,
            source_range.clone(),
        ));
    }

    (
        Feature::Reference(Reference {
            identifier: scanned.identifier.clone(),
            resolved_identifier,
            source_range,
        }),
        warnings,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diagnostic::SourcePosition;
    use url::Url;

    fn range() -> SourceRange {
        SourceRange::new(
            Arc::new(Url::parse("file:///a.html").unwrap()),
            SourcePosition::new(0, 0),
            SourcePosition::new(0, 1),
        )
    }

    #[test]
    fn polymer_element_answers_to_both_kinds() {
        let scanned = ScannedPolymerElement {
            tag_name: "my-el".into(),
            class_name: None,
            span: crate::diagnostic::Span::new(0, 1),
            behavior_assignments: Vec::new(),
            properties: Vec::new(),
            doc: None,
        };
        let (feature, warnings) = resolve_polymer_element(&scanned, range(), &std::collections::HashMap::new());
        assert!(warnings.is_empty());
        assert_eq!(feature.kinds(), &["element", "polymer-element"]);
    }

    #[test]
    fn unresolved_behavior_yields_warning_but_keeps_placeholder() {
        let scanned = ScannedPolymerElement {
            tag_name: "my-el".into(),
            class_name: None,
            span: crate::diagnostic::Span::new(0, 1),
            behavior_assignments: vec!["Missing.Behavior".into()],
            properties: Vec::new(),
            doc: None,
        };
        let (feature, warnings) = resolve_polymer_element(&scanned, range(), &std::collections::HashMap::new());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code(), "behavior-not-recognized");
        match feature {
            Feature::PolymerElement(p) => {
                assert_eq!(p.behaviors.len(), 1);
                assert!(p.behaviors[0].behavior.is_none());
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn duplicate_behavior_names_are_deduplicated() {
        let behavior = Arc::new(Behavior {
            name: "Foo.Behavior".into(),
            source_range: range(),
        });
        let mut map = std::collections::HashMap::new();
        map.insert("Foo.Behavior".to_string(), behavior);

        let scanned = ScannedPolymerElement {
            tag_name: "my-el".into(),
            class_name: None,
            span: crate::diagnostic::Span::new(0, 1),
            behavior_assignments: vec!["Foo.Behavior".into(), "Foo.Behavior".into()],
            properties: Vec::new(),
            doc: None,
        };
        let (feature, warnings) = resolve_polymer_element(&scanned, range(), &map);
        assert!(warnings.is_empty());
        match feature {
            Feature::PolymerElement(p) => assert_eq!(p.behaviors.len(), 1),
            _ => unreachable!(),
        }
    }
}
