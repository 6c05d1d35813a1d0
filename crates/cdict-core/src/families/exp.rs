//! Expressions (`exp-table`)

use std::fmt;

use crate::dictionary::{Dictionary, CONSTANT_TABLE, EXP_TABLE, TYP_TABLE};
use crate::error::Result;
use crate::families::attributes::shown;
use crate::families::{CConst, CTyp};
use crate::indexed_table::IndexedTable;
use crate::record::{Family, Record, Target};
use crate::registry::Registry;

pub struct Exps;

pub type ExpConstructor = for<'d> fn(Record<'d>) -> Box<dyn CExp<'d> + 'd>;

impl Family for Exps {
    const NAME: &'static str = "expression";

    type View<'d> = dyn CExp<'d> + 'd;
    type Constructor = ExpConstructor;

    fn construct<'d>(constructor: Self::Constructor, record: Record<'d>) -> Box<Self::View<'d>> {
        constructor(record)
    }

    fn table(dictionary: &Dictionary) -> &IndexedTable {
        dictionary.exp_table()
    }

    fn table_mut(dictionary: &mut Dictionary) -> &mut IndexedTable {
        dictionary.exp_table_mut()
    }
}

pub trait CExp<'d>: fmt::Display + fmt::Debug {
    fn record(&self) -> &Record<'d>;

    fn index(&self) -> usize {
        self.record().index()
    }

    fn tag(&self) -> &'d str {
        self.record().tag()
    }

    /// Sub-expressions, in argument order
    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(Vec::new())
    }

    /// Integer value, for integer constants
    fn intvalue(&self) -> Option<Result<i64>> {
        None
    }

    fn is_constant(&self) -> bool {
        self.tag() == "const"
    }

    fn is_sizeof(&self) -> bool {
        matches!(self.tag(), "sizeof" | "sizeofe" | "sizeofstr")
    }

    fn is_cast(&self) -> bool {
        self.tag() == "caste"
    }
}

/// Sub-expression at `position` of `view`, which may be `view` itself
fn exp_target<'v, 'd>(
    view: &'v (dyn CExp<'d> + 'd),
    position: usize,
) -> Result<Target<'v, dyn CExp<'d> + 'd>> {
    view.record()
        .follow(view, position, EXP_TABLE, |dictionary, index| {
            dictionary.get_exp(index)
        })
}

fn typ_at<'d>(record: &Record<'d>, position: usize) -> Result<Box<dyn CTyp<'d> + 'd>> {
    let index = record.arg_index(position, TYP_TABLE)?;
    record.dictionary().get_typ(index)
}

/// Constant expression
///
/// - args[0]: constant
#[derive(Debug)]
pub struct ExpConst<'d>(Record<'d>);

impl<'d> ExpConst<'d> {
    pub fn constant(&self) -> Result<Box<dyn CConst<'d> + 'd>> {
        let index = self.0.arg_index(0, CONSTANT_TABLE)?;
        self.0.dictionary().get_constant(index)
    }
}

impl<'d> CExp<'d> for ExpConst<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn intvalue(&self) -> Option<Result<i64>> {
        match self.constant() {
            Ok(constant) if constant.is_int() => constant.intvalue(),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl fmt::Display for ExpConst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shown(self.constant()))
    }
}

/// `sizeof` / `alignof` of a type
///
/// - args[0]: type
#[derive(Debug)]
pub struct ExpTypeOp<'d>(Record<'d>);

impl<'d> ExpTypeOp<'d> {
    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 0)
    }
}

impl<'d> CExp<'d> for ExpTypeOp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for ExpTypeOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.tag(), shown(self.typ()))
    }
}

/// `sizeof` / `alignof` of an expression
///
/// - args[0]: expression
#[derive(Debug)]
pub struct ExpExpOp<'d>(Record<'d>);

impl<'d> CExp<'d> for ExpExpOp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(vec![exp_target(self, 0)?])
    }
}

impl fmt::Display for ExpExpOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.0.tag().trim_end_matches('e');
        write!(f, "{}({})", name, shown(exp_target(self, 0)))
    }
}

/// `sizeof` of a string literal
///
/// - tags[1]: string
#[derive(Debug)]
pub struct ExpSizeOfStr<'d>(Record<'d>);

impl<'d> ExpSizeOfStr<'d> {
    pub fn stringvalue(&self) -> &'d str {
        self.0.tag_at(1)
    }
}

impl<'d> CExp<'d> for ExpSizeOfStr<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for ExpSizeOfStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sizeof(\"{}\")", self.stringvalue())
    }
}

/// Unary operation
///
/// - tags[1]: operator
/// - args[0]: operand
/// - args[1]: result type
#[derive(Debug)]
pub struct ExpUnOp<'d>(Record<'d>);

impl<'d> ExpUnOp<'d> {
    pub fn op(&self) -> &'d str {
        self.0.tag_at(1)
    }

    pub fn exp(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 0)
    }

    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 1)
    }
}

impl<'d> CExp<'d> for ExpUnOp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(vec![self.exp()?])
    }
}

impl fmt::Display for ExpUnOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.op(), shown(self.exp()))
    }
}

/// Binary operation
///
/// - tags[1]: operator
/// - args[0]: left operand
/// - args[1]: right operand
/// - args[2]: result type
#[derive(Debug)]
pub struct ExpBinOp<'d>(Record<'d>);

impl<'d> ExpBinOp<'d> {
    pub fn op(&self) -> &'d str {
        self.0.tag_at(1)
    }

    pub fn exp1(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 0)
    }

    pub fn exp2(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 1)
    }

    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 2)
    }
}

impl<'d> CExp<'d> for ExpBinOp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(vec![self.exp1()?, self.exp2()?])
    }
}

impl fmt::Display for ExpBinOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} {} {})",
            shown(self.exp1()),
            self.op(),
            shown(self.exp2())
        )
    }
}

/// Conditional expression
///
/// - args[0]: condition
/// - args[1]: true branch
/// - args[2]: false branch
/// - args[3]: result type
#[derive(Debug)]
pub struct ExpQuestion<'d>(Record<'d>);

impl<'d> ExpQuestion<'d> {
    pub fn condition(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 0)
    }

    pub fn true_exp(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 1)
    }

    pub fn false_exp(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 2)
    }

    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 3)
    }
}

impl<'d> CExp<'d> for ExpQuestion<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(vec![self.condition()?, self.true_exp()?, self.false_exp()?])
    }
}

impl fmt::Display for ExpQuestion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} ? {} : {})",
            shown(self.condition()),
            shown(self.true_exp()),
            shown(self.false_exp())
        )
    }
}

/// Cast expression
///
/// - args[0]: target type
/// - args[1]: operand
#[derive(Debug)]
pub struct ExpCastE<'d>(Record<'d>);

impl<'d> ExpCastE<'d> {
    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 0)
    }

    pub fn exp(&self) -> Result<Target<'_, dyn CExp<'d> + 'd>> {
        exp_target(self, 1)
    }
}

impl<'d> CExp<'d> for ExpCastE<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn subexps(&self) -> Result<Vec<Target<'_, dyn CExp<'d> + 'd>>> {
        Ok(vec![self.exp()?])
    }
}

impl fmt::Display for ExpCastE<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caste({},{})", shown(self.typ()), shown(self.exp()))
    }
}

fn construct_const<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpConst(record))
}

fn construct_type_op<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpTypeOp(record))
}

fn construct_exp_op<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpExpOp(record))
}

fn construct_sizeofstr<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpSizeOfStr(record))
}

fn construct_unop<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpUnOp(record))
}

fn construct_binop<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpBinOp(record))
}

fn construct_question<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpQuestion(record))
}

fn construct_caste<'d>(record: Record<'d>) -> Box<dyn CExp<'d> + 'd> {
    Box::new(ExpCastE(record))
}

pub(crate) fn register(registry: &mut Registry) {
    let variants: [(&str, ExpConstructor); 10] = [
        ("const", construct_const),
        ("sizeof", construct_type_op),
        ("alignof", construct_type_op),
        ("sizeofe", construct_exp_op),
        ("alignofe", construct_exp_op),
        ("sizeofstr", construct_sizeofstr),
        ("unop", construct_unop),
        ("binop", construct_binop),
        ("question", construct_question),
        ("caste", construct_caste),
    ];
    for (tag, constructor) in variants {
        registry.bind::<Exps>(tag, constructor);
    }
}
