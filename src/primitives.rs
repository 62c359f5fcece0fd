// primitives.rs - the built-in word catalogue
// Primitives are specified by their stack effect; each runs to completion
// against the program state.

use crate::state::{ProgramState, VmError};
use crate::syntax::SyntaxOp;

// ============================================================================
// CATALOGUE
// ============================================================================

/// Macro to define all primitives in a single place.
/// This generates the Primitive enum, name/describe tables, lookup, and the
/// execute dispatcher.
macro_rules! define_primitives {
    (
        $(
            $variant:ident => $name:literal : $desc:literal => $method:ident
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Primitive {
            $(
                #[doc = $desc]
                $variant,
            )*
        }

        impl Primitive {
            /// Get the source-level name of this primitive
            pub fn name(&self) -> &'static str {
                match self {
                    $(
                        Primitive::$variant => $name,
                    )*
                }
            }

            /// Get the one-line description shown by `help`
            pub fn describe(&self) -> &'static str {
                match self {
                    $(
                        Primitive::$variant => $desc,
                    )*
                }
            }

            /// Get a primitive by its source-level name
            pub fn from_name(name: &str) -> Option<Primitive> {
                match name {
                    $(
                        $name => Some(Primitive::$variant),
                    )*
                    _ => None,
                }
            }

            /// All primitives in declaration order
            pub fn all() -> &'static [Primitive] {
                &[
                    $(
                        Primitive::$variant,
                    )*
                ]
            }
        }

        // Generate the execute_primitive dispatcher for ProgramState
        impl ProgramState {
            pub fn execute_primitive(&mut self, prim: Primitive) -> Result<(), VmError> {
                match prim {
                    $(
                        Primitive::$variant => self.$method(),
                    )*
                }
            }
        }
    };
}

define_primitives! {
    // Stack
    Dot => ".": ". ( -- ) show the stack, at most the top 16 entries" => op_dot,
    StackLen => "stack_len": "stack_len ( -- n ) push the stack depth" => op_stack_len,
    Dup => "dup": "dup ( a -- a a ) duplicate the top of the stack" => op_dup,
    Swap => "swap": "swap ( a b -- b a ) swap the top two entries" => op_swap,
    Rot => "rot": "rot ( a b c -- b c a ) rotate the third entry to the top" => op_rot,
    Unrot => "unrot": "unrot ( a b c -- c a b ) rotate the top entry to third" => op_unrot,
    Rev => "rev": "rev ( a b c -- c b a ) reverse the whole stack" => op_rev,
    Drop => "drop": "drop ( a -- ) remove the top of the stack" => op_drop,
    RevN => "rev_n": "rev_n ( ... n -- ... ) reverse the top n entries" => op_rev_n,
    Nth => "nth": "nth ( ... n -- ... x ) copy the nth entry from the top, n >= 1" => op_nth,

    // Arithmetic (two's-complement wrap)
    Inc => "inc": "inc ( a -- a+1 ) increment" => op_inc,
    Dec => "dec": "dec ( a -- a-1 ) decrement" => op_dec,
    Add => "+": "+ ( a b -- a+b ) wrapping addition" => op_add,
    Mul => "*": "* ( a b -- a*b ) wrapping multiplication" => op_mul,
    Div => "/": "/ ( a b -- a/b ) signed division" => op_div,

    // Bitwise
    Shl => "shl": "shl ( a n -- a<<n ) shift left; shifts of 64 or more yield 0" => op_shl,
    Shr => "shr": "shr ( a n -- a>>n ) shift right; shifts of 64 or more yield 0" => op_shr,
    Or => "or": "or ( a b -- a|b ) bitwise or" => op_or,
    And => "and": "and ( a b -- a&b ) bitwise and" => op_and,
    Xor => "xor": "xor ( a b -- a^b ) bitwise xor" => op_xor,
    Not => "not": "not ( a -- ~a ) bitwise complement" => op_not,

    // Comparison; 0 is false, all ones is true
    Eq => "=": "= ( a b -- flag ) true when equal" => op_eq,
    Lt => "<": "< ( a b -- flag ) true when a is signed-less than b" => op_lt,
    True => "true": "true ( -- -1 ) push the all-ones flag" => op_true,
    False => "false": "false ( -- 0 ) push the zero flag" => op_false,

    // IO
    Print => "print": "print ( a -- ) pop and print as signed decimal" => op_print,
    Pstr => "pstr": "pstr ( a -- ) pop and print as packed bytes, stopping at NUL" => op_pstr,
    PrintString => "print_string": "print_string ( w... n -- ) pop n packed numbers and print them as a string" => op_print_string,

    // System
    Exit => "exit": "exit ( -- ) leave the session" => op_exit,
    Quit => "quit": "quit ( -- ) leave the session" => op_quit,

    // Introspection
    SyntaxList => "syntax": "syntax ( -- ) list the syntax operators" => op_syntax_list,
    PrimitiveList => "primitives": "primitives ( -- ) list the primitives" => op_primitive_list,
    WordList => "words": "words ( -- ) list the user words" => op_word_list,
    Guide => "guide": "guide ( -- ) print a short introduction" => op_guide,
}

// ============================================================================
// PRIMITIVE OPERATIONS
// ============================================================================

impl ProgramState {
    /// Dispatch a primitive, folding any typed failure into the error
    /// channel.
    pub fn run_primitive(&mut self, prim: Primitive) {
        if let Err(e) = self.execute_primitive(prim) {
            self.fail(format!("Error in {}: {}", prim.name(), e));
        }
    }

    fn op_dot(&mut self) -> Result<(), VmError> {
        if self.stack.is_empty() {
            self.emit("empty.\n");
            return Ok(());
        }
        let depth = self.stack.depth();
        let shown = depth.min(16);
        let mut line = String::new();
        if shown < depth {
            line.push_str("... ");
        }
        for value in &self.stack.as_slice()[depth - shown..] {
            line.push_str(&format!("{} ", *value as i64));
        }
        line.push('\n');
        self.emit(&line);
        Ok(())
    }

    fn op_stack_len(&mut self) -> Result<(), VmError> {
        let depth = self.stack.depth() as u64;
        self.stack.push(depth);
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), VmError> {
        let top = self.stack.peek()?;
        self.stack.push(top);
        Ok(())
    }

    fn op_swap(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(b);
        self.stack.push(a);
        Ok(())
    }

    fn op_rot(&mut self) -> Result<(), VmError> {
        // ( a b c -- b c a )
        self.stack.require(3)?;
        let c = self.stack.pop()?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(b);
        self.stack.push(c);
        self.stack.push(a);
        Ok(())
    }

    fn op_unrot(&mut self) -> Result<(), VmError> {
        // ( a b c -- c a b )
        self.stack.require(3)?;
        let c = self.stack.pop()?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(c);
        self.stack.push(a);
        self.stack.push(b);
        Ok(())
    }

    fn op_rev(&mut self) -> Result<(), VmError> {
        self.stack.reverse();
        Ok(())
    }

    fn op_drop(&mut self) -> Result<(), VmError> {
        self.stack.pop()?;
        Ok(())
    }

    fn op_rev_n(&mut self) -> Result<(), VmError> {
        let n = self.stack.peek()? as usize;
        self.stack.require(n + 1)?;
        self.stack.pop()?;
        self.stack.reverse_top(n)?;
        Ok(())
    }

    fn op_nth(&mut self) -> Result<(), VmError> {
        let n = self.stack.peek()? as usize;
        if n == 0 {
            return Err(VmError::BadArgument("expected an index of at least 1"));
        }
        self.stack.require(n + 1)?;
        self.stack.pop()?;
        let value = self.stack.as_slice()[self.stack.depth() - n];
        self.stack.push(value);
        Ok(())
    }

    fn op_inc(&mut self) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        self.stack.push(a.wrapping_add(1));
        Ok(())
    }

    fn op_dec(&mut self) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        self.stack.push(a.wrapping_sub(1));
        Ok(())
    }

    fn op_add(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(a.wrapping_add(b));
        Ok(())
    }

    fn op_mul(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(a.wrapping_mul(b));
        Ok(())
    }

    fn op_div(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        if self.stack.peek()? == 0 {
            return Err(VmError::DivisionByZero);
        }
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push((a as i64).wrapping_div(b as i64) as u64);
        Ok(())
    }

    fn op_shl(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let n = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(if n >= 64 { 0 } else { a << n });
        Ok(())
    }

    fn op_shr(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let n = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(if n >= 64 { 0 } else { a >> n });
        Ok(())
    }

    fn op_or(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(a | b);
        Ok(())
    }

    fn op_and(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(a & b);
        Ok(())
    }

    fn op_xor(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(a ^ b);
        Ok(())
    }

    fn op_not(&mut self) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        self.stack.push(!a);
        Ok(())
    }

    fn op_eq(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(if a == b { u64::MAX } else { 0 });
        Ok(())
    }

    fn op_lt(&mut self) -> Result<(), VmError> {
        self.stack.require(2)?;
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;
        self.stack.push(if (a as i64) < (b as i64) { u64::MAX } else { 0 });
        Ok(())
    }

    fn op_true(&mut self) -> Result<(), VmError> {
        self.stack.push(u64::MAX);
        Ok(())
    }

    fn op_false(&mut self) -> Result<(), VmError> {
        self.stack.push(0);
        Ok(())
    }

    fn op_print(&mut self) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        self.emit(&format!("{} ", a as i64));
        Ok(())
    }

    fn op_pstr(&mut self) -> Result<(), VmError> {
        let a = self.stack.pop()?;
        for i in 0..8 {
            let byte = (a >> (8 * i)) as u8;
            if byte == 0 {
                break;
            }
            self.emit_byte(byte);
        }
        Ok(())
    }

    fn op_print_string(&mut self) -> Result<(), VmError> {
        let n = self.stack.peek()? as usize;
        self.stack.require(n + 1)?;
        self.stack.pop()?;
        let mut packed = Vec::with_capacity(n);
        for _ in 0..n {
            packed.push(self.stack.pop()?);
        }
        packed.reverse();
        for (i, &word) in packed.iter().enumerate() {
            let last = i + 1 == n;
            for shift in 0..8 {
                let byte = (word >> (8 * shift)) as u8;
                if last && byte == 0 {
                    break;
                }
                self.emit_byte(byte);
            }
        }
        Ok(())
    }

    fn op_exit(&mut self) -> Result<(), VmError> {
        self.quit = true;
        Ok(())
    }

    fn op_quit(&mut self) -> Result<(), VmError> {
        self.quit = true;
        Ok(())
    }

    fn op_syntax_list(&mut self) -> Result<(), VmError> {
        let mut listing = String::new();
        for op in SyntaxOp::all() {
            listing.push_str(&format!("`{}`: {}\n", op.name(), op.describe()));
        }
        self.emit(&listing);
        Ok(())
    }

    fn op_primitive_list(&mut self) -> Result<(), VmError> {
        let mut listing = String::new();
        for prim in Primitive::all() {
            listing.push_str(&format!("`{}`: {}\n", prim.name(), prim.describe()));
        }
        self.emit(&listing);
        Ok(())
    }

    fn op_word_list(&mut self) -> Result<(), VmError> {
        if self.words.is_empty() {
            self.emit("no words defined.\n");
            return Ok(());
        }
        let mut listing = String::new();
        for word in &self.words {
            if word.desc.is_empty() {
                listing.push_str(&format!("`{}`\n", word.name));
            } else {
                listing.push_str(&format!("`{}`: {}\n", word.name, word.desc));
            }
        }
        self.emit(&listing);
        Ok(())
    }

    fn op_guide(&mut self) -> Result<(), VmError> {
        self.emit(GUIDE);
        Ok(())
    }
}

const GUIDE: &str = "\
Mieliepit is a stack language. Tokens are separated by spaces and run left
to right: numbers are pushed, everything else executes against the stack.

  1 2 + .                     add, then show the stack
  : sq ( a -- a*a ) dup * ;   define a word
  5 sq print                  run it
  help dup                    describe a word
  def sq                      print a definition
  words                       list your words

Conditionals and loops take the next unit, one token or a [ ] block:

  1 2 < ? [ 1 + ]             run the block when the flag is set
  3 rep [ 2 * ]               run the block three times

Inside a definition, rec restarts the word and ret returns from it.
";
