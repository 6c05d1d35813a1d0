//! Record families stored in a [`Dictionary`](crate::Dictionary)
//!
//! Attribute parameters, constants, expressions and types are open families:
//! their variants are registered by tag in a [`Registry`]. Attributes,
//! attribute lists and function arguments have a single fixed shape.

pub mod attributes;
pub mod constant;
pub mod exp;
pub mod typ;

pub use attributes::{
    AttrCons, AttrInt, AttrNary, AttrParam, AttrParamConstructor, AttrParams, AttrStar, AttrStr,
    AttrTypeOp, AttrUnary, Attribute, Attributes,
};
pub use constant::{
    CConst, ConstChr, ConstEnum, ConstInt, ConstReal, ConstStr, ConstantConstructor, Constants,
};
pub use exp::{
    CExp, ExpBinOp, ExpCastE, ExpConst, ExpConstructor, ExpExpOp, ExpQuestion, ExpSizeOfStr,
    ExpTypeOp, ExpUnOp, Exps,
};
pub use typ::{
    CTyp, FunArg, FunArgs, TypArray, TypBasic, TypComp, TypConstructor, TypFun, TypPtr, Typs,
};

use crate::registry::Registry;

/// Register every built-in variant of every open family
pub(crate) fn register_all(registry: &mut Registry) {
    attributes::register(registry);
    constant::register(registry);
    exp::register(registry);
    typ::register(registry);
}
