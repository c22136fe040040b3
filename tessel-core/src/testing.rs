//! Shared builders for unit tests.

use crate::codegen::CodegenCtx;
use crate::config::KernelConfig;
use crate::ir::{
    Body, Exp, IndexFun, Lambda, MemSummary, NameSource, PatElem, Pattern, SizeExpr, Space, Stm, SubExp,
    Type, VName, types,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn new_ctx() -> CodegenCtx {
    init_logging();
    CodegenCtx::new(KernelConfig::default(), NameSource::new())
}

/// Bind a host block of `size` elements. Returns the block.
pub fn bind_block(ctx: &mut CodegenCtx, base: &str, size: SizeExpr) -> VName {
    let mem = ctx.fresh(&format!("{}_mem", base));
    ctx.bind_mem(&mem, size, Space::Host);
    mem
}

/// Bind a rank-1 host array of `len` elements in its own block.
/// Returns `(array, block)`.
pub fn bind_vector(ctx: &mut CodegenCtx, base: &str, elem: Type, len: SizeExpr) -> (VName, VName) {
    let mem = bind_block(ctx, base, len.clone());
    let arr = ctx.fresh(base);
    ctx.bind_array(&arr, types::array(elem), MemSummary::new(&mem, IndexFun::iota(vec![len])));
    (arr, mem)
}

/// Bind a rank-2 host array in its own block. Returns `(array, block)`.
pub fn bind_matrix(
    ctx: &mut CodegenCtx,
    base: &str,
    elem: Type,
    rows: SizeExpr,
    cols: SizeExpr,
) -> (VName, VName) {
    let mem = bind_block(ctx, base, SizeExpr::mul(rows.clone(), cols.clone()));
    let arr = ctx.fresh(base);
    ctx.bind_array(
        &arr,
        types::array_of_rank(elem, 2),
        MemSummary::new(&mem, IndexFun::iota(vec![rows, cols])),
    );
    (arr, mem)
}

pub fn alloc_stm(block: &VName, size: SizeExpr) -> Stm {
    Stm::new(
        Pattern::single(PatElem::mem(block)),
        Exp::Alloc {
            size,
            space: Space::Host,
        },
    )
}

pub fn scalar_stm(name: &VName, ty: Type, exp: Exp) -> Stm {
    Stm::new(Pattern::single(PatElem::scalar(name, ty)), exp)
}

/// Row-major array pattern element of `shape` at the start of `mem`.
pub fn array_elem(name: &VName, elem: Type, mem: &VName, shape: Vec<SizeExpr>) -> PatElem {
    let rank = shape.len();
    PatElem::array(
        name,
        types::array_of_rank(elem, rank),
        MemSummary::new(mem, IndexFun::iota(shape)),
    )
}

pub fn lambda(params: Vec<PatElem>, stms: Vec<Stm>, result: Vec<SubExp>, ret: Vec<Type>) -> Lambda {
    Lambda {
        params,
        body: Body::new(stms, result),
        ret,
    }
}

pub fn map_stm(pat: Vec<PatElem>, lambda: Lambda, inputs: Vec<VName>) -> Stm {
    Stm::new(Pattern::new(pat), Exp::Map { lambda, inputs })
}

/// Evaluate a size with the given variable values.
pub fn eval_with(size: &SizeExpr, env: &[(&VName, i64)]) -> Option<i64> {
    size.eval(&|name: &VName| env.iter().find(|(v, _)| *v == name).map(|(_, value)| *value))
}
