// syntax.rs - parse-time operators
//
// Each operator supplies three handlers, one per interpreter mode. Handlers
// are free to consume further tokens and to re-enter the dispatcher; the
// compiling handlers report how many values they appended so callers can
// back-patch and roll back.

use crate::interpreter::{Interpreter, Mode};
use crate::primitives::Primitive;
use crate::runner::{run_span, Span};
use crate::state::{ProgramState, Word};
use crate::value::{RawFn, Value};

// ============================================================================
// CATALOGUE
// ============================================================================

/// Macro to define all syntax operators in a single place.
/// Generates the SyntaxOp enum, name/describe tables, lookup, and the three
/// per-mode dispatchers on the interpreter.
macro_rules! define_syntax {
    (
        $(
            $variant:ident => $name:literal : $desc:literal => ($run:ident, $ignore:ident, $compile:ident)
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SyntaxOp {
            $(
                #[doc = $desc]
                $variant,
            )*
        }

        impl SyntaxOp {
            /// Get the source-level name of this operator
            pub fn name(&self) -> &'static str {
                match self {
                    $(
                        SyntaxOp::$variant => $name,
                    )*
                }
            }

            /// Get the one-line description shown by `help`
            pub fn describe(&self) -> &'static str {
                match self {
                    $(
                        SyntaxOp::$variant => $desc,
                    )*
                }
            }

            /// Get an operator by its source-level name
            pub fn from_name(name: &str) -> Option<SyntaxOp> {
                match name {
                    $(
                        $name => Some(SyntaxOp::$variant),
                    )*
                    _ => None,
                }
            }

            /// All operators in declaration order
            pub fn all() -> &'static [SyntaxOp] {
                &[
                    $(
                        SyntaxOp::$variant,
                    )*
                ]
            }
        }

        impl Interpreter<'_, '_> {
            pub fn run_syntax(&mut self, op: SyntaxOp) {
                match op {
                    $(
                        SyntaxOp::$variant => self.$run(),
                    )*
                }
            }

            pub fn ignore_syntax(&mut self, op: SyntaxOp) {
                match op {
                    $(
                        SyntaxOp::$variant => self.$ignore(),
                    )*
                }
            }

            pub fn compile_syntax(&mut self, op: SyntaxOp) -> Option<usize> {
                match op {
                    $(
                        SyntaxOp::$variant => self.$compile(),
                    )*
                }
            }
        }
    };
}

define_syntax! {
    Comment => "(": "( ... ) skip everything up to the closing )" => (comment_skip, comment_skip, comment_compile),
    Str => "\"": "\" ... \" pack the text between the quotes into numbers, then push the count" => (string_run, string_ignore, string_compile),
    Hex => "hex": "hex W read the token W as a hexadecimal number" => (hex_run, hex_ignore, hex_compile),
    Short => "'": "' W pack the token W into a single number" => (short_run, short_ignore, short_compile),
    Help => "help": "help W print the description of W" => (help_run, help_ignore, help_compile),
    Def => "def": "def W print the definition of W" => (def_run, def_ignore, def_compile),
    Rec => "rec": "rec restart the word being defined" => (rec_run, nothing, rec_compile),
    Ret => "ret": "ret return from the word being defined" => (ret_run, nothing, ret_compile),
    Cond => "?": "? pop a flag; run the next unit when it is set, skip it otherwise" => (cond_run, cond_ignore, cond_compile),
    RepAnd => "rep_and": "rep_and pop a count; run the next unit that many times, then push the count" => (rep_and_run, rep_and_ignore, rep_and_compile),
    Rep => "rep": "rep pop a count; run the next unit that many times" => (rep_run, rep_ignore, rep_compile),
    Block => "[": "[ ... ] group a sequence of units into one unit" => (block_run, block_ignore, block_compile),
    BlockEnd => "]": "] close a [ block" => (block_end, block_end, block_end_compile),
    Define => ":": ": name ( desc ) ... ; define a user word" => (define_run, define_misplaced, define_misplaced_compile),
    EndDefine => ";": "; close a : definition" => (end_define, end_define, end_define_compile),
}

/// Pack bytes into numbers, least-significant byte first, eight per number.
pub fn pack_string(text: &str) -> Vec<u64> {
    text.as_bytes()
        .chunks(8)
        .map(|chunk| {
            let mut word = 0u64;
            for (i, byte) in chunk.iter().enumerate() {
                word |= (*byte as u64) << (8 * i);
            }
            word
        })
        .collect()
}

// ============================================================================
// HANDLERS
// ============================================================================

impl<'a, 's> Interpreter<'a, 's> {
    fn nothing(&mut self) {}

    /// Consume one token without resolving it.
    fn skip_one_token(&mut self, operator: &str) {
        if self.lexer.advance_token().is_none() {
            self.state
                .fail(format!("Error: {} expects a word", operator));
        } else {
            self.lexer.mark_handled();
        }
    }

    // ------------------------------------------------------------------
    // ( ... ) comment
    // ------------------------------------------------------------------

    // The body is not interpreted; a nested ( is literal text.
    fn comment_skip(&mut self) {
        loop {
            match self.lexer.advance_token() {
                None => {
                    self.state.fail("Error: unclosed comment, expected )");
                    return;
                }
                Some(token) => {
                    self.lexer.mark_handled();
                    if token.text == ")" {
                        return;
                    }
                }
            }
        }
    }

    fn comment_compile(&mut self) -> Option<usize> {
        self.comment_skip();
        if self.state.error.is_some() {
            None
        } else {
            Some(0)
        }
    }

    // ------------------------------------------------------------------
    // " ... " string
    // ------------------------------------------------------------------

    /// The raw text between the quotes. Interior separators survive because
    /// the slice runs from the first token's start to the last token's end
    /// in the source line.
    fn string_text(&mut self) -> Option<&'a str> {
        let line = self.lexer.line();
        let mut span: Option<(usize, usize)> = None;
        loop {
            let token = match self.lexer.advance_token() {
                None => {
                    self.state.fail("Error: unclosed string, expected \"");
                    return None;
                }
                Some(token) => token,
            };
            self.lexer.mark_handled();
            if token.text == "\"" {
                break;
            }
            let start = span.map_or(token.offset, |(s, _)| s);
            span = Some((start, token.offset + token.text.len()));
        }
        Some(span.map_or("", |(start, end)| &line[start..end]))
    }

    fn string_run(&mut self) {
        let text = match self.string_text() {
            Some(text) => text,
            None => return,
        };
        let packed = pack_string(text);
        for word in &packed {
            self.state.stack.push(*word);
        }
        self.state.stack.push(packed.len() as u64);
    }

    fn string_ignore(&mut self) {
        let _ = self.string_text();
    }

    fn string_compile(&mut self) -> Option<usize> {
        let text = self.string_text()?;
        let packed = pack_string(text);
        for word in &packed {
            self.state.code.push(Value::Number(*word));
        }
        self.state.code.push(Value::Number(packed.len() as u64));
        Some(packed.len() + 1)
    }

    // ------------------------------------------------------------------
    // hex W
    // ------------------------------------------------------------------

    fn hex_number(&mut self) -> Option<u64> {
        let token = match self.lexer.advance_token() {
            None => {
                self.state.fail("Error: hex expects a word");
                return None;
            }
            Some(token) => token,
        };
        self.lexer.mark_handled();
        if token.text.len() > 16 {
            self.state.fail("Error: hex number too large");
            return None;
        }
        let mut number = 0u64;
        for byte in token.text.bytes() {
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => {
                    self.state.fail("Error: invalid hex digit");
                    return None;
                }
            };
            number = (number << 4) | digit as u64;
        }
        Some(number)
    }

    fn hex_run(&mut self) {
        if let Some(number) = self.hex_number() {
            self.state.stack.push(number);
        }
    }

    fn hex_ignore(&mut self) {
        self.skip_one_token("hex");
    }

    fn hex_compile(&mut self) -> Option<usize> {
        let number = self.hex_number()?;
        self.state.code.push(Value::Number(number));
        Some(1)
    }

    // ------------------------------------------------------------------
    // ' W short string
    // ------------------------------------------------------------------

    fn short_number(&mut self) -> Option<u64> {
        let token = match self.lexer.advance_token() {
            None => {
                self.state.fail("Error: ' expects a word");
                return None;
            }
            Some(token) => token,
        };
        self.lexer.mark_handled();
        if token.text.len() > 8 {
            self.state.fail("Error: short string too long");
            return None;
        }
        Some(pack_string(token.text).first().copied().unwrap_or(0))
    }

    fn short_run(&mut self) {
        if let Some(number) = self.short_number() {
            self.state.stack.push(number);
        }
    }

    fn short_ignore(&mut self) {
        self.skip_one_token("'");
    }

    fn short_compile(&mut self) -> Option<usize> {
        let number = self.short_number()?;
        self.state.code.push(Value::Number(number));
        Some(1)
    }

    // ------------------------------------------------------------------
    // help W
    // ------------------------------------------------------------------

    /// Resolve the next token without executing it, in the same priority
    /// order as the dispatcher.
    fn help_text(&mut self) -> Option<String> {
        let token = match self.lexer.advance_token() {
            None => {
                self.state.fail("Error: help expects a word");
                return None;
            }
            Some(token) => token,
        };
        self.lexer.mark_handled();
        let text = token.text;
        if let Some(idx) = self.state.find_word(text) {
            let word = &self.state.words[idx];
            return Some(if word.desc.is_empty() {
                format!("`{}`\n", word.name)
            } else {
                format!("`{}`: {}\n", word.name, word.desc)
            });
        }
        if let Some(prim) = Primitive::from_name(text) {
            return Some(format!("`{}`: {}\n", prim.name(), prim.describe()));
        }
        if let Some(op) = SyntaxOp::from_name(text) {
            return Some(format!("`{}`: {}\n", op.name(), op.describe()));
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            return Some(format!("`{}` is a number\n", text));
        }
        self.state.fail("Error: undefined word");
        None
    }

    fn help_run(&mut self) {
        if let Some(text) = self.help_text() {
            self.state.emit(&text);
        }
    }

    fn help_ignore(&mut self) {
        self.skip_one_token("help");
    }

    fn help_compile(&mut self) -> Option<usize> {
        let text = self.help_text()?;
        Some(self.compile_print_text(&text))
    }

    /// Emit the text as a packed string literal followed by `print_string`,
    /// so the compiled word reproduces the output when it runs.
    fn compile_print_text(&mut self, text: &str) -> usize {
        let packed = pack_string(text);
        for word in &packed {
            self.state.code.push(Value::Number(*word));
        }
        self.state.code.push(Value::Number(packed.len() as u64));
        self.state.code.push(Value::Primitive(Primitive::PrintString));
        packed.len() + 2
    }

    // ------------------------------------------------------------------
    // def W
    // ------------------------------------------------------------------

    fn def_text(&mut self) -> Option<String> {
        let token = match self.lexer.advance_token() {
            None => {
                self.state.fail("Error: def expects a word");
                return None;
            }
            Some(token) => token,
        };
        self.lexer.mark_handled();
        let text = token.text;
        if let Some(idx) = self.state.find_word(text) {
            return Some(render_word(self.state, idx));
        }
        if let Some(prim) = Primitive::from_name(text) {
            return Some(format!("`{}` is a built-in primitive\n", prim.name()));
        }
        if let Some(op) = SyntaxOp::from_name(text) {
            return Some(format!("`{}` is a built-in syntax operator\n", op.name()));
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            return Some(format!("`{}` is a number\n", text));
        }
        self.state.fail("Error: undefined word");
        None
    }

    fn def_run(&mut self) {
        if let Some(text) = self.def_text() {
            self.state.emit(&text);
        }
    }

    fn def_ignore(&mut self) {
        self.skip_one_token("def");
    }

    fn def_compile(&mut self) -> Option<usize> {
        let text = self.def_text()?;
        Some(self.compile_print_text(&text))
    }

    // ------------------------------------------------------------------
    // rec / ret
    // ------------------------------------------------------------------

    fn rec_run(&mut self) {
        self.state
            .fail("Error: rec is only valid when defining a word");
    }

    fn ret_run(&mut self) {
        self.state
            .fail("Error: ret is only valid when defining a word");
    }

    fn rec_compile(&mut self) -> Option<usize> {
        self.state.code.push(Value::RawFn(RawFn::Restart));
        Some(1)
    }

    fn ret_compile(&mut self) -> Option<usize> {
        self.state.code.push(Value::RawFn(RawFn::Return));
        Some(1)
    }

    // ------------------------------------------------------------------
    // ? conditional
    // ------------------------------------------------------------------

    fn cond_run(&mut self) {
        let predicate = match self.state.stack.pop() {
            Ok(value) => value,
            Err(e) => {
                self.state.fail(format!("Error in ?: {}", e));
                return;
            }
        };
        if predicate != 0 {
            if !self.run_next() && self.state.error.is_none() {
                self.state.fail("Error: ? expects a unit");
            }
        } else {
            self.ignore_unit("?");
        }
    }

    fn cond_ignore(&mut self) {
        self.ignore_unit("?");
    }

    /// Consume the next unit structurally, whatever the surrounding mode.
    fn ignore_unit(&mut self, operator: &str) {
        let prev = self.mode;
        self.mode = Mode::Ignore;
        let advanced = self.ignore_next();
        self.mode = prev;
        if !advanced && self.state.error.is_none() {
            self.state
                .fail(format!("Error: {} expects a unit", operator));
        }
    }

    fn cond_compile(&mut self) -> Option<usize> {
        self.compile_guarded(RawFn::SkipIfZero, "?", false)
    }

    /// Emit `[length literal][raw function]`, compile the protected unit,
    /// then back-patch the literal with the unit's emitted length.
    fn compile_guarded(&mut self, raw: RawFn, operator: &str, then_drop: bool) -> Option<usize> {
        let patch = self.state.code.len();
        self.state.code.push(Value::Number(0));
        self.state.code.push(Value::RawFn(raw));
        let unit = match self.compile_next() {
            Some(len) => len,
            None => {
                if self.state.error.is_none() {
                    self.state
                        .fail(format!("Error: {} expects a unit", operator));
                }
                return None;
            }
        };
        self.state.code[patch] = Value::Number(unit as u64);
        let mut emitted = 2 + unit;
        if then_drop {
            self.state.code.push(Value::Primitive(Primitive::Drop));
            emitted += 1;
        }
        Some(emitted)
    }

    // ------------------------------------------------------------------
    // rep_and / rep
    // ------------------------------------------------------------------

    fn rep_and_run(&mut self) {
        self.run_repeat("rep_and", true);
    }

    fn rep_run(&mut self) {
        self.run_repeat("rep", false);
    }

    /// Compile the next unit into a scratch tail of the code buffer, run it
    /// count times, then roll the tail back.
    fn run_repeat(&mut self, operator: &str, push_count: bool) {
        let count = match self.state.stack.pop() {
            Ok(value) => value,
            Err(e) => {
                self.state.fail(format!("Error in {}: {}", operator, e));
                return;
            }
        };
        let scratch = self.state.code.len();
        let prev = self.mode;
        self.mode = Mode::Compile;
        let compiled = self.compile_next();
        self.mode = prev;
        let len = match compiled {
            Some(len) => len,
            None => {
                if self.state.error.is_none() {
                    self.state
                        .fail(format!("Error: {} expects a unit", operator));
                }
                self.state.code.truncate(scratch);
                return;
            }
        };
        let body = Span { pos: scratch, len };
        let mut remaining = count;
        while remaining > 0 && self.state.error.is_none() {
            run_span(self.state, body);
            remaining -= 1;
        }
        self.state.code.truncate(scratch);
        if push_count && self.state.error.is_none() {
            self.state.stack.push(count);
        }
    }

    fn rep_and_ignore(&mut self) {
        self.ignore_unit("rep_and");
    }

    fn rep_ignore(&mut self) {
        self.ignore_unit("rep");
    }

    fn rep_and_compile(&mut self) -> Option<usize> {
        self.compile_guarded(RawFn::Repeat, "rep_and", false)
    }

    fn rep_compile(&mut self) -> Option<usize> {
        self.compile_guarded(RawFn::Repeat, "rep", true)
    }

    // ------------------------------------------------------------------
    // [ ... ] block
    // ------------------------------------------------------------------

    fn block_run(&mut self) {
        loop {
            if self.state.error.is_some() {
                return;
            }
            let token = match self.lexer.current() {
                None => {
                    self.state.fail("Error: unclosed block, expected ]");
                    return;
                }
                Some(token) => token,
            };
            if token.text == "]" {
                self.lexer.mark_handled();
                return;
            }
            self.run_next();
        }
    }

    fn block_ignore(&mut self) {
        loop {
            if self.state.error.is_some() {
                return;
            }
            let token = match self.lexer.current() {
                None => {
                    self.state.fail("Error: unclosed block, expected ]");
                    return;
                }
                Some(token) => token,
            };
            if token.text == "]" {
                self.lexer.mark_handled();
                return;
            }
            self.ignore_next();
        }
    }

    // The contents are emitted contiguously; the total is the block's length
    // as a single unit.
    fn block_compile(&mut self) -> Option<usize> {
        let mut total = 0;
        loop {
            if self.state.error.is_some() {
                return None;
            }
            let token = match self.lexer.current() {
                None => {
                    self.state.fail("Error: unclosed block, expected ]");
                    return None;
                }
                Some(token) => token,
            };
            if token.text == "]" {
                self.lexer.mark_handled();
                return Some(total);
            }
            total += self.compile_next()?;
        }
    }

    fn block_end(&mut self) {
        self.state.fail("Error: ] without a matching [");
    }

    fn block_end_compile(&mut self) -> Option<usize> {
        self.block_end();
        None
    }

    // ------------------------------------------------------------------
    // : name ( desc ) ... ; definition
    // ------------------------------------------------------------------

    fn define_run(&mut self) {
        let name = match self.lexer.advance_token() {
            None => {
                self.state.fail("Error: expected a name after :");
                return;
            }
            Some(token) => token.text.to_string(),
        };
        self.lexer.mark_handled();
        let desc = match self.parse_description() {
            Some(desc) => desc,
            None => return,
        };

        let code_start = self.state.code.len();
        let prev = self.mode;
        self.mode = Mode::Compile;
        let mut closed = false;
        loop {
            if self.state.error.is_some() {
                break;
            }
            let token = match self.lexer.current() {
                None => {
                    self.state
                        .fail("Error: unterminated definition, expected ;");
                    break;
                }
                Some(token) => token,
            };
            if token.text == ";" {
                self.lexer.mark_handled();
                closed = true;
                break;
            }
            if self.compile_next().is_none() {
                break;
            }
        }
        self.mode = prev;

        if closed && self.state.error.is_none() {
            let code_len = self.state.code.len() - code_start;
            self.state.words.push(Word {
                name,
                desc,
                code_pos: code_start,
                code_len,
            });
        } else {
            // A failed definition leaves no trace.
            self.state.code.truncate(code_start);
        }
    }

    /// Parse the optional `( ... )` description after the definition name.
    /// One level of nested parentheses is honoured inside the description;
    /// this is the only place nesting is recognised.
    fn parse_description(&mut self) -> Option<String> {
        let opener = match self.lexer.current() {
            None => {
                self.state
                    .fail("Error: unterminated definition, expected ;");
                return None;
            }
            Some(token) => token,
        };
        if opener.text != "(" {
            return Some(String::new());
        }
        self.lexer.mark_handled();
        let line = self.lexer.line();
        let mut depth = 1usize;
        let mut span: Option<(usize, usize)> = None;
        loop {
            let token = match self.lexer.advance_token() {
                None => {
                    self.state.fail("Error: unclosed comment, expected )");
                    return None;
                }
                Some(token) => token,
            };
            self.lexer.mark_handled();
            match token.text {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            let start = span.map_or(token.offset, |(s, _)| s);
            span = Some((start, token.offset + token.text.len()));
        }
        Some(span.map_or(String::new(), |(start, end)| line[start..end].to_string()))
    }

    fn define_misplaced(&mut self) {
        self.state.fail("Error: : is only valid at the top level");
    }

    fn define_misplaced_compile(&mut self) -> Option<usize> {
        self.define_misplaced();
        None
    }

    fn end_define(&mut self) {
        self.state.fail("Error: ; without a matching :");
    }

    fn end_define_compile(&mut self) -> Option<usize> {
        self.end_define();
        None
    }
}

// ============================================================================
// DEFINITION PRINTING
// ============================================================================

/// Reconstruct the source form of a user word from its compiled slice.
fn render_word(state: &ProgramState, idx: usize) -> String {
    let word = &state.words[idx];
    let mut text = String::from(": ");
    text.push_str(&word.name);
    if !word.desc.is_empty() {
        text.push_str(" ( ");
        text.push_str(&word.desc);
        text.push_str(" )");
    }
    render_slice(state, word.code_pos, word.code_len, &mut text);
    text.push_str(" ;\n");
    text
}

fn render_slice(state: &ProgramState, pos: usize, len: usize, text: &mut String) {
    let mut i = 0;
    while i < len {
        match state.code[pos + i] {
            Value::Number(n) => {
                // A literal in front of ? or rep_and is the back-patched
                // unit length; render the pair back to its surface form so
                // the printed text recompiles to the same shape.
                let next = if i + 1 < len {
                    Some(state.code[pos + i + 1])
                } else {
                    None
                };
                if let Some(Value::RawFn(raw @ (RawFn::SkipIfZero | RawFn::Repeat))) = next {
                    let unit = n as usize;
                    if unit <= len - i - 2 {
                        text.push(' ');
                        text.push_str(raw.name());
                        if unit == 1 {
                            render_slice(state, pos + i + 2, 1, text);
                        } else {
                            text.push_str(" [");
                            render_slice(state, pos + i + 2, unit, text);
                            text.push_str(" ]");
                        }
                        i += 2 + unit;
                        continue;
                    }
                }
                text.push_str(&format!(" {}", n));
            }
            Value::Word(w) => {
                text.push(' ');
                text.push_str(&state.words[w].name);
            }
            Value::Primitive(prim) => {
                text.push(' ');
                text.push_str(prim.name());
            }
            Value::RawFn(raw) => {
                text.push(' ');
                text.push_str(raw.name());
            }
            Value::Syntax(op) => {
                text.push(' ');
                text.push_str(op.name());
            }
        }
        i += 1;
    }
}
