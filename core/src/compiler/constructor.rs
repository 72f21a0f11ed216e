use tracing::debug;

use crate::compiler::{ClassWriter, LocalVariable};
use crate::errors::CodegenError;
use crate::types::Method;
use crate::vm::Access;

/// Adds a public nullary constructor to `cw` that calls the superclass's
/// nullary constructor and returns, as a source compiler does when a class
/// declares none:
///
/// ```text
/// public Foo() {
///     super();
/// }
/// ```
///
/// Whether the superclass has such a constructor is not checked here; a
/// missing one is reported when the class is defined.
pub fn define_default_constructor(cw: &mut ClassWriter) -> Result<(), CodegenError> {
    let init = Method::nullary_init();
    let mut mg = cw.begin_method(Access::PUBLIC, init.clone());

    // `this` lives for the whole body; the bounds are never branched to.
    let start = mg.new_debug_label();
    let end = mg.new_debug_label();
    mg.mark(start);
    let this_var = LocalVariable::this_var(cw.this_type(), start, end);
    this_var.gen_code(&mut mg);
    mg.invoke_constructor(cw.super_type().type_descriptor(), &init);
    mg.return_value();
    mg.mark(end);
    this_var.table_entry(&mut mg);

    debug!(
        class = cw.this_type().class_name(),
        superclass = cw.super_type().class_name(),
        "synthesized default constructor"
    );
    cw.add_method(mg)
}
