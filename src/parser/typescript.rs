use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::config::RelinkConfig;
use crate::model::{ImportReference, Language, StatementKind};

use super::{ReferenceScanner, ScanError};

/// Scanner for TypeScript, TSX and JavaScript sources.
pub struct TypeScriptScanner {
    lazy_wrappers: Vec<String>,
    mock_objects: Vec<String>,
    mock_methods: Vec<String>,
    // We create parsers per-call since tree_sitter::Parser is not Sync
}

impl TypeScriptScanner {
    pub fn new(config: &RelinkConfig) -> Self {
        Self {
            lazy_wrappers: config.lazy_wrappers.clone(),
            mock_objects: config.mock_objects.clone(),
            mock_methods: config.mock_methods.clone(),
        }
    }

    fn create_parser(language: Language, path: &Path) -> Result<Parser, ScanError> {
        let mut parser = Parser::new();
        let ts_language = match language {
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        };
        parser
            .set_language(&ts_language)
            .map_err(|e| ScanError::Parser {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(parser)
    }
}

impl Default for TypeScriptScanner {
    fn default() -> Self {
        Self::new(&RelinkConfig::default())
    }
}

impl ReferenceScanner for TypeScriptScanner {
    fn scan(&self, path: &Path, source: &str) -> Result<Vec<ImportReference>, ScanError> {
        let language =
            Language::from_path(path).ok_or_else(|| ScanError::Unsupported(path.to_path_buf()))?;
        let mut parser = Self::create_parser(language, path)?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ScanError::NoTree(path.to_path_buf()))?;

        if tree.root_node().has_error() {
            return Err(ScanError::Syntax {
                path: path.to_path_buf(),
                line: first_error_line(tree.root_node()).unwrap_or(1),
            });
        }

        let mut extractor = Extractor::new(self, path, source, &tree);
        extractor.extract();
        Ok(extractor.references)
    }

    fn supports(&self, path: &Path) -> bool {
        Language::from_path(path).is_some()
    }
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .filter(|c| c.has_error())
        .find_map(first_error_line);
    found
}

/// Walks a tree-sitter CST and collects import-like references.
struct Extractor<'a> {
    scanner: &'a TypeScriptScanner,
    path: &'a Path,
    source: &'a str,
    lines: Vec<&'a str>,
    tree: &'a Tree,
    references: Vec<ImportReference>,
}

impl<'a> Extractor<'a> {
    fn new(scanner: &'a TypeScriptScanner, path: &'a Path, source: &'a str, tree: &'a Tree) -> Self {
        Self {
            scanner,
            path,
            source,
            lines: source.lines().collect(),
            tree,
            references: Vec::new(),
        }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn extract(&mut self) {
        let root = self.tree.root_node();
        self.visit_children(root);
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit_node(child);
        }
    }

    fn visit_node(&mut self, node: Node) {
        match node.kind() {
            "import_statement" => {
                self.extract_import(node);
            }
            "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.record(source, StatementKind::ReExport);
                } else {
                    // export const x = require('...'), export default lazy(...)
                    self.visit_children(node);
                }
            }
            "call_expression" => {
                if !self.try_extract_lazy(node) {
                    self.try_extract_call(node);
                    // Still visit children: mock factories may contain requireActual calls
                    self.visit_children(node);
                }
            }
            _ => {
                self.visit_children(node);
            }
        }
    }

    /// `import ... from '...'`, `import '...'`, `import x = require('...')`
    fn extract_import(&mut self, node: Node) {
        if let Some(source) = node.child_by_field_name("source") {
            self.record(source, StatementKind::StaticImport);
            return;
        }

        let mut cursor = node.walk();
        let require_clause = node
            .children(&mut cursor)
            .find(|c| c.kind() == "import_require_clause");
        if let Some(clause) = require_clause {
            let source = clause.child_by_field_name("source").or_else(|| {
                let mut cursor = clause.walk();
                let found = clause.children(&mut cursor).find(|c| c.kind() == "string");
                found
            });
            if let Some(source) = source {
                self.record(source, StatementKind::Require);
            }
        }
    }

    /// Dynamic import, `require(...)` and test-framework mock directives.
    fn try_extract_call(&mut self, node: Node) -> bool {
        let Some(kind) = self.call_kind(node) else {
            return false;
        };
        if let Some(arg) = first_argument(node) {
            self.record(arg, kind);
        }
        true
    }

    fn call_kind(&self, node: Node) -> Option<StatementKind> {
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "import" => Some(StatementKind::DynamicImport),
            "identifier" if self.node_text(func) == "require" => Some(StatementKind::Require),
            "member_expression" => {
                let object = func.child_by_field_name("object")?;
                let property = func.child_by_field_name("property")?;
                let is_mock = object.kind() == "identifier"
                    && self.scanner.mock_objects.iter().any(|o| o == self.node_text(object))
                    && self.scanner.mock_methods.iter().any(|m| m == self.node_text(property));
                is_mock.then_some(StatementKind::TestMock)
            }
            _ => None,
        }
    }

    fn is_lazy_wrapper(&self, func: Node) -> bool {
        let name = match func.kind() {
            "identifier" => self.node_text(func),
            "member_expression" => match func.child_by_field_name("property") {
                Some(property) => self.node_text(property),
                None => return false,
            },
            _ => return false,
        };
        self.scanner.lazy_wrappers.iter().any(|w| w == name)
    }

    /// `lazy(() => import('...'))`: the wrapper's first argument is a function
    /// whose body is (or returns) a dynamic import call.
    fn try_extract_lazy(&mut self, node: Node) -> bool {
        let Some(func) = node.child_by_field_name("function") else {
            return false;
        };
        if !self.is_lazy_wrapper(func) {
            return false;
        }
        let Some(callback) = first_argument(node) else {
            return false;
        };
        if !matches!(callback.kind(), "arrow_function" | "function_expression" | "function") {
            return false;
        }
        let Some(import_call) = callback
            .child_by_field_name("body")
            .and_then(|body| self.find_returned_import(body))
        else {
            return false;
        };
        if let Some(arg) = first_argument(import_call) {
            self.record(arg, StatementKind::LazyImport);
        }
        true
    }

    /// Find the `import(...)` call an arrow body evaluates to.
    ///
    /// Looks through `await`, parentheses, a single `.then(...)` chain and a
    /// `return` inside a block body.
    fn find_returned_import(&self, node: Node<'a>) -> Option<Node<'a>> {
        match node.kind() {
            "call_expression" => {
                let func = node.child_by_field_name("function")?;
                match func.kind() {
                    "import" => Some(node),
                    "member_expression" => {
                        let object = func.child_by_field_name("object")?;
                        let is_import = object.kind() == "call_expression"
                            && object
                                .child_by_field_name("function")
                                .is_some_and(|f| f.kind() == "import");
                        is_import.then_some(object)
                    }
                    _ => None,
                }
            }
            "await_expression" | "parenthesized_expression" => {
                let inner = node.named_child(0)?;
                self.find_returned_import(inner)
            }
            "statement_block" => {
                let mut cursor = node.walk();
                let ret = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() == "return_statement")?;
                let value = ret.named_child(0)?;
                self.find_returned_import(value)
            }
            _ => None,
        }
    }

    /// Record a specifier node if it is a plain string literal.
    fn record(&mut self, node: Node, kind: StatementKind) {
        let Some(literal) = self.string_literal(node) else {
            // Computed specifiers cannot be matched statically
            return;
        };
        let row = node.start_position().row;
        self.references.push(ImportReference {
            source_file: self.path.to_path_buf(),
            line: row + 1,
            literal,
            kind,
            statement: self
                .lines
                .get(row)
                .map(|l| l.trim().to_string())
                .unwrap_or_default(),
            span: node.start_byte()..node.end_byte(),
        });
    }

    fn string_literal(&self, node: Node) -> Option<String> {
        match node.kind() {
            "string" => {}
            "template_string" => {
                let mut cursor = node.walk();
                let interpolated = node
                    .children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution");
                if interpolated {
                    return None;
                }
            }
            _ => return None,
        }
        let text = self.node_text(node);
        if text.len() < 2 {
            return None;
        }
        Some(text[1..text.len() - 1].to_string())
    }
}

/// First non-comment argument of a call expression.
fn first_argument(call: Node) -> Option<Node> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    first
}
