// codegen.rs — Arduino sketch rendering
//
// Renders a finished ProgramAssembly into sketch source:
// header → includes → global objects → setup() → loop().
//
// Preconditions: all blocks of the pass have been emitted into the assembly.
// Postconditions: returns `CodegenResult` with the sketch source string.
// Failure modes: none; diagnostics recorded by the assembly are forwarded.
// Side effects: none.

use std::fmt::Write as _;

use crate::assembly::ProgramAssembly;
use crate::diag::Diagnostic;
use crate::fragment::Fragment;

const INDENT: &str = "  ";

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CodegenResult {
    pub generated: GeneratedCode,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct GeneratedCode {
    pub sketch_source: String,
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Emit the leading "Generated by" comment.
    pub header: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions { header: true }
    }
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn codegen(assembly: &ProgramAssembly, options: &CodegenOptions) -> CodegenResult {
    let mut ctx = CodegenCtx {
        assembly,
        options,
        out: String::with_capacity(1024),
    };
    ctx.emit_all();
    CodegenResult {
        generated: GeneratedCode {
            sketch_source: ctx.out,
        },
        diagnostics: assembly.diagnostics().to_vec(),
    }
}

// ── Internal context ────────────────────────────────────────────────────────

struct CodegenCtx<'a> {
    assembly: &'a ProgramAssembly,
    options: &'a CodegenOptions,
    out: String,
}

impl CodegenCtx<'_> {
    fn emit_all(&mut self) {
        self.emit_header();
        self.emit_includes();
        self.emit_objects();
        self.emit_setup();
        self.emit_loop();
    }

    fn emit_header(&mut self) {
        if self.options.header {
            self.out
                .push_str("// Generated by tofgen (TOF400C block code generator)\n");
        }
    }

    fn emit_includes(&mut self) {
        let includes = self.assembly.includes();
        for inc in includes {
            let _ = writeln!(self.out, "{}", inc.text);
        }
        if !includes.is_empty() {
            self.out.push('\n');
        }
    }

    fn emit_objects(&mut self) {
        let objects = self.assembly.objects();
        for obj in objects {
            let _ = writeln!(self.out, "{}", obj.text());
        }
        if !objects.is_empty() {
            self.out.push('\n');
        }
    }

    // Setup statements keep first-registration order; the critical flag is
    // carried on the assembly, not rendered.
    fn emit_setup(&mut self) {
        self.out.push_str("void setup() {\n");
        for stmt in self.assembly.setup() {
            self.emit_indented(&stmt.code);
        }
        self.out.push_str("}\n\n");
    }

    fn emit_loop(&mut self) {
        self.out.push_str("void loop() {\n");
        for fragment in self.assembly.code() {
            match fragment {
                Fragment::Statement { code } => self.emit_indented(code),
                // A reporter left at top level is evaluated for its side effects.
                Fragment::Expression { expr } => self.emit_indented(&format!("{};", expr.code)),
            }
        }
        self.out.push_str("}\n");
    }

    fn emit_indented(&mut self, code: &str) {
        for line in code.lines() {
            if line.trim().is_empty() {
                self.out.push('\n');
            } else {
                let _ = writeln!(self.out, "{}{}", INDENT, line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Expr;

    #[test]
    fn empty_assembly_renders_skeleton() {
        let asm = ProgramAssembly::new();
        let result = codegen(&asm, &CodegenOptions { header: false });
        assert_eq!(
            result.generated.sketch_source,
            "void setup() {\n}\n\nvoid loop() {\n}\n"
        );
    }

    #[test]
    fn sections_render_in_order() {
        let mut asm = ProgramAssembly::new();
        asm.add_code("b();");
        asm.add_setup("s", "s();", true);
        asm.add_object("o", "Obj", "o(1);");
        asm.add_include("I", "#include <i.h>");
        asm.add_expr(Expr::atomic("c()"));

        let result = codegen(&asm, &CodegenOptions::default());
        assert_eq!(
            result.generated.sketch_source,
            "// Generated by tofgen (TOF400C block code generator)\n\
             #include <i.h>\n\
             \n\
             Obj o(1);\n\
             \n\
             void setup() {\n  s();\n}\n\
             \n\
             void loop() {\n  b();\n  c();\n}\n"
        );
    }

    #[test]
    fn multiline_statements_are_indented_per_line() {
        let mut asm = ProgramAssembly::new();
        asm.add_code("if (x) {\n  y();\n}\n");
        let result = codegen(&asm, &CodegenOptions { header: false });
        assert!(result
            .generated
            .sketch_source
            .contains("void loop() {\n  if (x) {\n    y();\n  }\n}\n"));
    }

    #[test]
    fn diagnostics_are_forwarded() {
        let mut asm = ProgramAssembly::new();
        asm.add_object("o", "Obj", "o(1);");
        asm.add_object("o", "Obj", "o(2);");
        let result = codegen(&asm, &CodegenOptions::default());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.generated.sketch_source.contains("Obj o(1);"));
        assert!(!result.generated.sketch_source.contains("o(2)"));
    }
}
