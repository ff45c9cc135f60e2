// assembly.rs — Per-pass program accumulator
//
// Collects the four sections of an Arduino sketch while blocks are emitted:
// includes, global object declarations, setup statements, and the inline
// loop stream. Keyed sections keep the first registration of each key at the
// position where it was first registered; later registrations are dropped.
//
// Preconditions: one assembly per generation pass.
// Postconditions: keyed sections hold unique keys in first-registration order.
// Failure modes: none. Conflicting re-registrations become warnings.
// Side effects: none.

use std::collections::HashMap;

use serde::Serialize;

use crate::diag::{codes, DiagCode, Diagnostic};
use crate::fragment::{Expr, Fragment};

// ── Section entries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Include {
    pub key: String,
    pub text: String,
}

/// A global object declaration, rendered as `<type_name> <declarator>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDecl {
    pub key: String,
    pub type_name: String,
    pub declarator: String,
}

impl ObjectDecl {
    pub fn text(&self) -> String {
        format!("{} {}", self.type_name, self.declarator)
    }
}

/// A statement run once from `setup()`. Critical statements halt the
/// firmware when they fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStatement {
    pub key: String,
    pub code: String,
    pub critical: bool,
}

// ── Keyed section ───────────────────────────────────────────────────────────

/// Ordered, first-writer-wins map.
#[derive(Debug, Clone)]
struct Keyed<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Keyed<T> {
    fn default() -> Self {
        Keyed {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Keyed<T> {
    fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    fn insert(&mut self, key: &str, entry: T) {
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push(entry);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<T: Serialize> Serialize for Keyed<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

// ── Program assembly ────────────────────────────────────────────────────────

/// The accumulating sketch for one generation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramAssembly {
    includes: Keyed<Include>,
    objects: Keyed<ObjectDecl>,
    setup: Keyed<SetupStatement>,
    code: Vec<Fragment>,
    diagnostics: Vec<Diagnostic>,
}

impl ProgramAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an include line. Returns `true` if the key was new.
    pub fn add_include(&mut self, key: &str, text: &str) -> bool {
        if let Some(existing) = self.includes.get(key) {
            let conflict = existing.text != text;
            self.note_duplicate("include", key, conflict, codes::CONFLICTING_INCLUDE);
            return false;
        }
        self.includes.insert(
            key,
            Include {
                key: key.to_string(),
                text: text.to_string(),
            },
        );
        true
    }

    /// Register a global object. Returns `true` if the key was new.
    pub fn add_object(&mut self, key: &str, type_name: &str, declarator: &str) -> bool {
        if let Some(existing) = self.objects.get(key) {
            let conflict = existing.type_name != type_name || existing.declarator != declarator;
            self.note_duplicate("object", key, conflict, codes::CONFLICTING_OBJECT);
            return false;
        }
        self.objects.insert(
            key,
            ObjectDecl {
                key: key.to_string(),
                type_name: type_name.to_string(),
                declarator: declarator.to_string(),
            },
        );
        true
    }

    /// Register a setup statement. Returns `true` if the key was new.
    pub fn add_setup(&mut self, key: &str, code: &str, critical: bool) -> bool {
        if let Some(existing) = self.setup.get(key) {
            let conflict = existing.code != code || existing.critical != critical;
            self.note_duplicate("setup statement", key, conflict, codes::CONFLICTING_SETUP);
            return false;
        }
        self.setup.insert(
            key,
            SetupStatement {
                key: key.to_string(),
                code: code.to_string(),
                critical,
            },
        );
        true
    }

    /// Append a statement at the current code location. Never deduplicated.
    pub fn add_code(&mut self, statement: impl Into<String>) {
        self.code.push(Fragment::Statement {
            code: statement.into(),
        });
    }

    /// Append an expression at the current code location. Never deduplicated.
    pub fn add_expr(&mut self, expr: Expr) {
        self.code.push(Fragment::Expression { expr });
    }

    fn note_duplicate(&mut self, section: &str, key: &str, conflict: bool, code: DiagCode) {
        if conflict {
            tracing::debug!(section, key, "conflicting re-registration dropped");
            self.diagnostics.push(
                Diagnostic::warning(format!(
                    "{} re-registered with different text; first registration kept",
                    section
                ))
                .with_code(code)
                .with_key(key)
                .with_hint("blocks sharing this resource should use identical parameters"),
            );
        } else {
            tracing::debug!(section, key, "duplicate registration dropped");
        }
    }

    /// Discard everything, ready for the next pass.
    pub fn reset(&mut self) {
        self.includes.clear();
        self.objects.clear();
        self.setup.clear();
        self.code.clear();
        self.diagnostics.clear();
    }

    pub fn includes(&self) -> &[Include] {
        &self.includes.entries
    }

    pub fn objects(&self) -> &[ObjectDecl] {
        &self.objects.entries
    }

    pub fn setup(&self) -> &[SetupStatement] {
        &self.setup.entries
    }

    pub fn code(&self) -> &[Fragment] {
        &self.code
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn object(&self, key: &str) -> Option<&ObjectDecl> {
        self.objects.get(key)
    }

    pub fn setup_statement(&self, key: &str) -> Option<&SetupStatement> {
        self.setup.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.includes.entries.is_empty()
            && self.objects.entries.is_empty()
            && self.setup.entries.is_empty()
            && self.code.is_empty()
    }
}
