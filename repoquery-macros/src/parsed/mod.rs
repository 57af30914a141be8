#[allow(unused_imports)]
use super::*;

mod entity;
mod field;
mod type_ref;

pub(crate) use entity::ParsedEntity;
use field::ParsedField;
use type_ref::TypeShape;
