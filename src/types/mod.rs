pub mod argument_type;
pub mod registry;
pub mod validation;
pub mod value;

pub use argument_type::{
    ArgumentType, EntryType, Scalar, TypeKind, any, boolean, character, choice, complex_map, custom, exact_list,
    float, int, list, map, pair, scalar, string,
};
pub use registry::TypeRegistry;
pub use validation::{InvalidElement, Validation, ValueOrValidation};
pub use value::Value;
