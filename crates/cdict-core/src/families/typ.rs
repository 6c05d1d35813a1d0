//! C types (`typ-table`) and function argument lists
//! (`funarg-table`, `funargs-table`)

use std::fmt;

use crate::dictionary::{Dictionary, ATTRIBUTES_TABLE, EXP_TABLE, FUNARGS_TABLE, FUNARG_TABLE, TYP_TABLE};
use crate::error::Result;
use crate::families::attributes::shown;
use crate::families::{Attributes, CExp};
use crate::indexed_table::IndexedTable;
use crate::record::{Family, Record, Target};
use crate::registry::Registry;

pub struct Typs;

pub type TypConstructor = for<'d> fn(Record<'d>) -> Box<dyn CTyp<'d> + 'd>;

impl Family for Typs {
    const NAME: &'static str = "type";

    type View<'d> = dyn CTyp<'d> + 'd;
    type Constructor = TypConstructor;

    fn construct<'d>(constructor: Self::Constructor, record: Record<'d>) -> Box<Self::View<'d>> {
        constructor(record)
    }

    fn table(dictionary: &Dictionary) -> &IndexedTable {
        dictionary.typ_table()
    }

    fn table_mut(dictionary: &mut Dictionary) -> &mut IndexedTable {
        dictionary.typ_table_mut()
    }
}

pub trait CTyp<'d>: fmt::Display + fmt::Debug {
    fn record(&self) -> &Record<'d>;

    /// Position of the attribute list among the record arguments
    fn attributes_position(&self) -> usize {
        0
    }

    fn index(&self) -> usize {
        self.record().index()
    }

    fn tag(&self) -> &'d str {
        self.record().tag()
    }

    fn attributes(&self) -> Result<Attributes<'d>> {
        let record = self.record();
        let index = record.arg_index(self.attributes_position(), ATTRIBUTES_TABLE)?;
        record.dictionary().get_attributes(index)
    }

    /// Pointed-to type of a pointer, element type of an array, return type
    /// of a function
    fn target(&self) -> Option<Result<Target<'_, dyn CTyp<'d> + 'd>>> {
        None
    }

    fn is_void(&self) -> bool {
        self.tag() == "tvoid"
    }

    fn is_int(&self) -> bool {
        self.tag() == "tint"
    }

    fn is_float(&self) -> bool {
        self.tag() == "tfloat"
    }

    fn is_pointer(&self) -> bool {
        self.tag() == "tptr"
    }

    fn is_array(&self) -> bool {
        self.tag() == "tarray"
    }

    fn is_function(&self) -> bool {
        self.tag() == "tfun"
    }

    fn is_named_type(&self) -> bool {
        self.tag() == "tnamed"
    }

    fn is_comp(&self) -> bool {
        self.tag() == "tcomp"
    }

    fn is_enum(&self) -> bool {
        self.tag() == "tenum"
    }

    fn is_builtin_vaargs(&self) -> bool {
        self.tag() == "tbuiltin-va-list"
    }
}

fn typ_at<'d>(record: &Record<'d>, position: usize) -> Result<Box<dyn CTyp<'d> + 'd>> {
    let index = record.arg_index(position, TYP_TABLE)?;
    record.dictionary().get_typ(index)
}

/// Type at `position` of `view`, which may be `view` itself
fn typ_target<'v, 'd>(
    view: &'v (dyn CTyp<'d> + 'd),
    position: usize,
) -> Result<Target<'v, dyn CTyp<'d> + 'd>> {
    view.record()
        .follow(view, position, TYP_TABLE, |dictionary, index| {
            dictionary.get_typ(index)
        })
}

fn with_attributes<'d>(typ: &dyn CTyp<'d>, text: String, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match typ.attributes() {
        Ok(attributes) if !attributes.is_empty() => write!(f, "{} [{}]", text, attributes),
        _ => write!(f, "{}", text),
    }
}

/// Types without subcomponents: `tvoid`, `tint`, `tfloat`, `tnamed`,
/// `tenum`, `tbuiltin-va-list`
///
/// - tags[1]: integer/float kind, type name or enum name (absent for
///   `tvoid` and `tbuiltin-va-list`)
/// - args[0]: attributes
#[derive(Debug)]
pub struct TypBasic<'d>(Record<'d>);

impl<'d> TypBasic<'d> {
    /// Integer or float kind, typedef name, or enumeration name
    pub fn name(&self) -> &'d str {
        self.0.tag_at(1)
    }
}

impl<'d> CTyp<'d> for TypBasic<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }
}

impl fmt::Display for TypBasic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.0.tag() {
            "tvoid" => "void".to_string(),
            "tbuiltin-va-list" => "__builtin_va_list".to_string(),
            "tenum" => format!("enum {}", self.name()),
            _ => self.name().to_string(),
        };
        with_attributes(self, text, f)
    }
}

/// Pointer type
///
/// - args[0]: pointed-to type
/// - args[1]: attributes
#[derive(Debug)]
pub struct TypPtr<'d>(Record<'d>);

impl<'d> CTyp<'d> for TypPtr<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn attributes_position(&self) -> usize {
        1
    }

    fn target(&self) -> Option<Result<Target<'_, dyn CTyp<'d> + 'd>>> {
        Some(typ_target(self, 0))
    }
}

impl fmt::Display for TypPtr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_attributes(self, format!("({} *)", shown(typ_target(self, 0))), f)
    }
}

/// Array type
///
/// - args[0]: element type
/// - args[1]: size expression (-1 if absent)
/// - args[2]: attributes
#[derive(Debug)]
pub struct TypArray<'d>(Record<'d>);

impl<'d> TypArray<'d> {
    pub fn array_size_expr(&self) -> Result<Option<Box<dyn CExp<'d> + 'd>>> {
        let index = self.0.opt_arg_index(1, EXP_TABLE)?;
        self.0.dictionary().get_exp_opt(index)
    }

    pub fn has_array_size_expr(&self) -> bool {
        self.0.args().get(1).is_some_and(|&arg| arg >= 0)
    }
}

impl<'d> CTyp<'d> for TypArray<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn attributes_position(&self) -> usize {
        2
    }

    fn target(&self) -> Option<Result<Target<'_, dyn CTyp<'d> + 'd>>> {
        Some(typ_target(self, 0))
    }
}

impl fmt::Display for TypArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.array_size_expr() {
            Ok(Some(exp)) => exp.to_string(),
            Ok(None) => "?".to_string(),
            Err(err) => format!("<{}>", err),
        };
        with_attributes(self, format!("{}[{}]", shown(typ_target(self, 0)), size), f)
    }
}

/// Function type
///
/// - args[0]: return type
/// - args[1]: argument list (-1 if unspecified)
/// - args[2]: 1 if variadic
/// - args[3]: attributes
#[derive(Debug)]
pub struct TypFun<'d>(Record<'d>);

impl<'d> TypFun<'d> {
    pub fn return_type(&self) -> Result<Target<'_, dyn CTyp<'d> + 'd>> {
        typ_target(self, 0)
    }

    pub fn funargs(&self) -> Result<Option<FunArgs<'d>>> {
        let index = self.0.opt_arg_index(1, FUNARGS_TABLE)?;
        self.0.dictionary().get_funargs_opt(index)
    }

    pub fn is_vararg(&self) -> bool {
        self.0.args().get(2) == Some(&1)
    }

    /// A prototype that declares neither arguments nor varargs
    pub fn is_default_function_prototype(&self) -> bool {
        matches!(self.funargs(), Ok(None)) && !self.is_vararg()
    }
}

impl<'d> CTyp<'d> for TypFun<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn attributes_position(&self) -> usize {
        3
    }

    fn target(&self) -> Option<Result<Target<'_, dyn CTyp<'d> + 'd>>> {
        Some(self.return_type())
    }
}

impl fmt::Display for TypFun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = match self.funargs() {
            Ok(Some(funargs)) => funargs.to_string(),
            Ok(None) => String::new(),
            Err(err) => format!("<{}>", err),
        };
        let vararg = if self.is_vararg() { ", ..." } else { "" };
        with_attributes(
            self,
            format!("({})({}{})", shown(self.return_type()), args, vararg),
            f,
        )
    }
}

/// Struct or union type
///
/// - args[0]: struct key, local to the translation unit
/// - args[1]: attributes
#[derive(Debug)]
pub struct TypComp<'d>(Record<'d>);

impl TypComp<'_> {
    /// File-local key of the struct or union
    pub fn ckey(&self) -> Result<i64> {
        self.0.value().check_key(1, 2, TYP_TABLE)?;
        self.0.arg(0, TYP_TABLE)
    }
}

impl<'d> CTyp<'d> for TypComp<'d> {
    fn record(&self) -> &Record<'d> {
        &self.0
    }

    fn attributes_position(&self) -> usize {
        1
    }
}

impl fmt::Display for TypComp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        with_attributes(self, format!("struct {}", shown(self.ckey())), f)
    }
}

fn construct_basic<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypBasic(record))
}

fn construct_ptr<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypPtr(record))
}

fn construct_array<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypArray(record))
}

fn construct_fun<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypFun(record))
}

fn construct_comp<'d>(record: Record<'d>) -> Box<dyn CTyp<'d> + 'd> {
    Box::new(TypComp(record))
}

pub(crate) fn register(registry: &mut Registry) {
    let variants: [(&str, TypConstructor); 10] = [
        ("tvoid", construct_basic),
        ("tint", construct_basic),
        ("tfloat", construct_basic),
        ("tnamed", construct_basic),
        ("tenum", construct_basic),
        ("tbuiltin-va-list", construct_basic),
        ("tptr", construct_ptr),
        ("tarray", construct_array),
        ("tfun", construct_fun),
        ("tcomp", construct_comp),
    ];
    for (tag, constructor) in variants {
        registry.bind::<Typs>(tag, constructor);
    }
}

/// Function argument
///
/// - tags[0]: argument name
/// - args[0]: type
/// - args[1]: attributes
#[derive(Debug, Clone, Copy)]
pub struct FunArg<'d>(Record<'d>);

impl<'d> FunArg<'d> {
    pub fn new(record: Record<'d>) -> Self {
        Self(record)
    }

    pub fn index(&self) -> usize {
        self.0.index()
    }

    pub fn name(&self) -> &'d str {
        self.0.tag()
    }

    pub fn typ(&self) -> Result<Box<dyn CTyp<'d> + 'd>> {
        typ_at(&self.0, 0)
    }

    pub fn attributes(&self) -> Result<Attributes<'d>> {
        let index = self.0.arg_index(1, ATTRIBUTES_TABLE)?;
        self.0.dictionary().get_attributes(index)
    }
}

impl fmt::Display for FunArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", shown(self.typ()), self.name())
    }
}

/// Function argument list
///
/// - args[0..]: function arguments
#[derive(Debug, Clone, Copy)]
pub struct FunArgs<'d>(Record<'d>);

impl<'d> FunArgs<'d> {
    pub fn new(record: Record<'d>) -> Self {
        Self(record)
    }

    pub fn index(&self) -> usize {
        self.0.index()
    }

    pub fn len(&self) -> usize {
        self.0.args().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.args().is_empty()
    }

    pub fn args(&self) -> Result<Vec<FunArg<'d>>> {
        (0..self.0.args().len())
            .map(|position| {
                let index = self.0.arg_index(position, FUNARG_TABLE)?;
                self.0.dictionary().get_funarg(index)
            })
            .collect()
    }
}

impl fmt::Display for FunArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.args() {
            Ok(args) => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", args.join(", "))
            }
            Err(err) => write!(f, "<{}>", err),
        }
    }
}
