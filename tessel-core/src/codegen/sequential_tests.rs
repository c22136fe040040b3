use super::sequential::SequentialCompiler;
use super::{CodegenCtx, ExpCompiler, VarEntry};
use crate::error::{CompilerError, ErrorCategory, Result};
use crate::imp::{Code, ImpExp, Stmt};
use crate::ir::{BinOp, Body, Exp, PatElem, Pattern, PrimValue, SizeExpr, Space, Stm, SubExp, VName, types};
use crate::kernel::space::DeviceScope;
use crate::testing::{
    alloc_stm, array_elem, bind_block, bind_matrix, bind_vector, lambda, map_stm, new_ctx, scalar_stm,
};

fn compile(ctx: &mut CodegenCtx, stms: &[Stm]) -> Result<Code> {
    let mut code = Code::new();
    SequentialCompiler.compile_stms(ctx, stms, &mut code)?;
    Ok(code)
}

fn add(lhs: SubExp, rhs: SubExp) -> Exp {
    Exp::BinOp {
        op: BinOp::Add,
        lhs,
        rhs,
    }
}

#[test]
fn test_binop_declares_and_sets_scalar() {
    let mut ctx = new_ctx();
    let x = ctx.fresh("x");
    let y = ctx.fresh("y");
    ctx.bind_scalar(&x, types::i64());

    let code = compile(&mut ctx, &[scalar_stm(&y, types::i64(), add(SubExp::var(&x), SubExp::int(1)))]).unwrap();

    assert_eq!(
        code.stmts(),
        &[
            Stmt::DeclareScalar {
                name: y.clone(),
                ty: types::i64(),
            },
            Stmt::SetScalar {
                name: y.clone(),
                value: ImpExp::bin_op(BinOp::Add, ImpExp::Var(x), ImpExp::Const(PrimValue::Int(1))),
            },
        ]
    );
    assert_eq!(ctx.entry(&y).unwrap(), &VarEntry::Scalar { ty: types::i64() });
}

#[test]
fn test_index_reads_through_index_function() {
    let mut ctx = new_ctx();
    let (a, a_mem) = bind_matrix(&mut ctx, "a", types::f32(), 3.into(), 4.into());
    let i = ctx.fresh("i");
    let v = ctx.fresh("v");
    ctx.bind_scalar(&i, types::i64());

    let stm = scalar_stm(
        &v,
        types::f32(),
        Exp::Index {
            array: a,
            indices: vec![SubExp::var(&i), SubExp::int(2)],
        },
    );
    let code = compile(&mut ctx, &[stm]).unwrap();

    match &code.stmts()[1] {
        Stmt::Read {
            dest,
            mem,
            index,
            elem,
            space,
        } => {
            assert_eq!(dest, &v);
            assert_eq!(mem, &a_mem);
            assert_eq!(index, &SizeExpr::add(SizeExpr::mul(SizeExpr::var(&i), 4.into()), 2.into()));
            assert_eq!(elem, &types::f32());
            assert_eq!(*space, Space::Host);
        }
        other => panic!("expected a read, got {:?}", other),
    }
}

#[test]
fn test_partial_index_is_internal_error() {
    let mut ctx = new_ctx();
    let (a, _) = bind_matrix(&mut ctx, "a", types::f32(), 3.into(), 4.into());
    let v = ctx.fresh("v");

    let stm = scalar_stm(
        &v,
        types::f32(),
        Exp::Index {
            array: a,
            indices: vec![SubExp::int(0)],
        },
    );
    let err = compile(&mut ctx, &[stm]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Internal);
}

#[test]
fn test_unknown_variable() {
    let mut ctx = new_ctx();
    let missing = VName::new("missing", 1000);
    let v = ctx.fresh("v");

    let stm = scalar_stm(
        &v,
        types::f32(),
        Exp::Index {
            array: missing.clone(),
            indices: vec![SubExp::int(0)],
        },
    );
    let err = compile(&mut ctx, &[stm]).unwrap_err();
    assert_eq!(err, CompilerError::UnknownVariable(missing));
}

#[test]
fn test_update_writes_into_destination_block() {
    let mut ctx = new_ctx();
    let (xs, xs_mem) = bind_vector(&mut ctx, "xs", types::f32(), 8.into());
    let xs2 = ctx.fresh("xs2");
    let val = ctx.fresh("val");
    ctx.bind_scalar(&val, types::f32());

    let stm = Stm::new(
        Pattern::single(array_elem(&xs2, types::f32(), &xs_mem, vec![8.into()])),
        Exp::Update {
            array: xs,
            indices: vec![SubExp::int(5)],
            value: SubExp::var(&val),
        },
    );
    let code = compile(&mut ctx, &[stm]).unwrap();

    assert_eq!(
        code.stmts(),
        &[Stmt::Write {
            mem: xs_mem,
            index: SizeExpr::Const(5),
            elem: types::f32(),
            space: Space::Host,
            value: ImpExp::Var(val),
        }]
    );
}

#[test]
fn test_if_assigns_branch_results() {
    let mut ctx = new_ctx();
    let c = ctx.fresh("c");
    let x = ctx.fresh("x");
    let r = ctx.fresh("r");
    ctx.bind_scalar(&c, types::bool());
    ctx.bind_scalar(&x, types::i64());

    let stm = scalar_stm(
        &r,
        types::i64(),
        Exp::If {
            cond: SubExp::var(&c),
            then_body: Body::new(vec![], vec![SubExp::var(&x)]),
            else_body: Body::new(vec![], vec![SubExp::int(0)]),
        },
    );
    let code = compile(&mut ctx, &[stm]).unwrap();

    assert_eq!(code.len(), 2);
    assert_eq!(
        code.stmts()[1],
        Stmt::If {
            cond: ImpExp::Var(c),
            then_code: Code::from_iter([Stmt::SetScalar {
                name: r.clone(),
                value: ImpExp::Var(x),
            }]),
            else_code: Code::from_iter([Stmt::SetScalar {
                name: r,
                value: ImpExp::Const(PrimValue::Int(0)),
            }]),
        }
    );
}

#[test]
fn test_loop_stages_merge_results() {
    let mut ctx = new_ctx();
    let n = ctx.fresh("n");
    let acc = ctx.fresh("acc");
    let i = ctx.fresh("i");
    let sum = ctx.fresh("sum");
    let res = ctx.fresh("res");
    ctx.bind_scalar(&n, types::i64());

    let stm = scalar_stm(
        &res,
        types::i64(),
        Exp::Loop {
            merge: vec![(PatElem::scalar(&acc, types::i64()), SubExp::int(0))],
            counter: i.clone(),
            bound: SubExp::var(&n),
            body: Body::new(
                vec![scalar_stm(&sum, types::i64(), add(SubExp::var(&acc), SubExp::var(&i)))],
                vec![SubExp::var(&sum)],
            ),
        },
    );
    let code = compile(&mut ctx, &[stm]).unwrap();

    // res declared, acc declared and initialized, loop, res assigned
    assert_eq!(code.len(), 5);
    assert_eq!(
        code.stmts()[2],
        Stmt::SetScalar {
            name: acc.clone(),
            value: ImpExp::Const(PrimValue::Int(0)),
        }
    );
    let body = match &code.stmts()[3] {
        Stmt::For { counter, bound, body } => {
            assert_eq!(counter, &i);
            assert_eq!(bound, &ImpExp::Var(n.clone()));
            body
        }
        other => panic!("expected a loop, got {:?}", other),
    };
    // The new value goes through a temporary before acc is overwritten.
    let next = match &body.stmts()[2] {
        Stmt::DeclareScalar { name, .. } => name.clone(),
        other => panic!("expected a staging temporary, got {:?}", other),
    };
    assert_eq!(next.base, "acc_next");
    assert_eq!(
        &body.stmts()[3..],
        &[
            Stmt::SetScalar {
                name: next.clone(),
                value: ImpExp::Var(sum),
            },
            Stmt::SetScalar {
                name: acc.clone(),
                value: ImpExp::Var(next),
            },
        ]
    );
    assert_eq!(
        code.stmts()[4],
        Stmt::SetScalar {
            name: res,
            value: ImpExp::Var(acc),
        }
    );
}

#[test]
fn test_alloc_declares_and_binds_block() {
    let mut ctx = new_ctx();
    let n = ctx.fresh("n");
    let mem = ctx.fresh("mem");
    ctx.bind_scalar(&n, types::i64());

    let size = SizeExpr::mul(SizeExpr::var(&n), 2.into());
    let code = compile(&mut ctx, &[alloc_stm(&mem, size.clone())]).unwrap();

    assert_eq!(
        code.stmts(),
        &[
            Stmt::DeclareMem {
                name: mem.clone(),
                space: Space::Host,
            },
            Stmt::Allocate {
                mem: mem.clone(),
                size: size.clone(),
                space: Space::Host,
            },
        ]
    );
    assert_eq!(ctx.lookup_mem(&mem).unwrap(), (&size, Space::Host));
}

#[test]
fn test_alloc_inside_kernel_is_refused() {
    let mut ctx = new_ctx();
    let mem = ctx.fresh("mem");

    let err = {
        let mut scope = DeviceScope::enter(&mut ctx);
        compile(&mut scope, &[alloc_stm(&mem, 4.into())]).unwrap_err()
    };
    assert!(matches!(err, CompilerError::UnimplementedInKernel(_)));
    assert_eq!(err.category(), ErrorCategory::Unsupported);
    assert!(ctx.entry(&mem).is_err());
}

#[test]
fn test_array_result_in_place_needs_no_code() {
    let mut ctx = new_ctx();
    let (xs, xs_mem) = bind_vector(&mut ctx, "xs", types::f32(), 8.into());
    let ys = ctx.fresh("ys");

    let stm = Stm::new(
        Pattern::single(array_elem(&ys, types::f32(), &xs_mem, vec![8.into()])),
        Exp::SubExp(SubExp::var(&xs)),
    );
    let code = compile(&mut ctx, &[stm]).unwrap();
    assert!(code.is_empty());
}

#[test]
fn test_array_result_elsewhere_is_internal_error() {
    let mut ctx = new_ctx();
    let (xs, _) = bind_vector(&mut ctx, "xs", types::f32(), 8.into());
    let other_mem = bind_block(&mut ctx, "other", 8.into());
    let ys = ctx.fresh("ys");

    let stm = Stm::new(
        Pattern::single(array_elem(&ys, types::f32(), &other_mem, vec![8.into()])),
        Exp::SubExp(SubExp::var(&xs)),
    );
    let err = compile(&mut ctx, &[stm]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Internal);
}

#[test]
fn test_map_becomes_loop() {
    let mut ctx = new_ctx();
    let n = ctx.fresh("n");
    ctx.bind_scalar(&n, types::i64());
    let (xs, xs_mem) = bind_vector(&mut ctx, "xs", types::f32(), SizeExpr::var(&n));
    let ys_mem = bind_block(&mut ctx, "ys", SizeExpr::var(&n));
    let ys = ctx.fresh("ys");
    let x = ctx.fresh("x");
    let y = ctx.fresh("y");

    let lam = lambda(
        vec![PatElem::scalar(&x, types::f32())],
        vec![scalar_stm(
            &y,
            types::f32(),
            Exp::BinOp {
                op: BinOp::Mul,
                lhs: SubExp::var(&x),
                rhs: SubExp::var(&x),
            },
        )],
        vec![SubExp::var(&y)],
        vec![types::f32()],
    );
    let stm = map_stm(
        vec![array_elem(&ys, types::f32(), &ys_mem, vec![SizeExpr::var(&n)])],
        lam,
        vec![xs],
    );
    let code = compile(&mut ctx, &[stm]).unwrap();

    assert!(code.kernels().is_empty());
    let (counter, body) = match code.stmts() {
        [Stmt::For { counter, bound, body }] => {
            assert_eq!(bound, &ImpExp::Var(n.clone()));
            (counter, body)
        }
        other => panic!("expected a single loop, got {:?}", other),
    };
    assert_eq!(
        body.stmts()[1],
        Stmt::Read {
            dest: x,
            mem: xs_mem,
            index: SizeExpr::var(counter),
            elem: types::f32(),
            space: Space::Host,
        }
    );
    assert_eq!(
        body.stmts().last(),
        Some(&Stmt::Write {
            mem: ys_mem,
            index: SizeExpr::var(counter),
            elem: types::f32(),
            space: Space::Host,
            value: ImpExp::Var(y),
        })
    );
    assert!(matches!(ctx.entry(&ys).unwrap(), VarEntry::Array { .. }));
}

#[test]
fn test_context_queries() {
    let mut ctx = new_ctx();
    let n = ctx.fresh("n");
    ctx.bind_scalar(&n, types::i64());
    let (xs, xs_mem) = bind_vector(&mut ctx, "xs", types::f32(), SizeExpr::var(&n));

    assert_eq!(ctx.lookup_type(&n).unwrap(), types::i64());
    assert_eq!(ctx.lookup_type(&xs).unwrap(), types::array(types::f32()));
    assert_eq!(ctx.lookup_type(&xs_mem).unwrap(), types::mem());
    assert_eq!(ctx.array_shape(&xs).unwrap(), &[SizeExpr::var(&n)]);
    assert_eq!(ctx.mem_size(&xs_mem).unwrap(), &SizeExpr::var(&n));
    assert_eq!(ctx.lookup_array(&n).unwrap_err().category(), ErrorCategory::Internal);
    assert_eq!(ctx.lookup_mem(&xs).unwrap_err().category(), ErrorCategory::Internal);

    let dims = [SubExp::var(&n), SubExp::int(3)];
    assert_eq!(ctx.size_from_dims(&dims).unwrap(), SizeExpr::mul(SizeExpr::var(&n), 3.into()));
    assert!(ctx.size_from_dims(&[SubExp::Const(PrimValue::Bool(true))]).is_err());
}

#[test]
fn test_context_free_vars_of_body() {
    let mut ctx = new_ctx();
    let (a, b) = (ctx.fresh("a"), ctx.fresh("b"));
    let body = Body::new(
        vec![scalar_stm(&b, types::i64(), add(SubExp::var(&a), SubExp::int(1)))],
        vec![SubExp::var(&b)],
    );

    let free: Vec<VName> = ctx.free_vars(&body).into_iter().collect();
    assert_eq!(free, vec![a]);
}
