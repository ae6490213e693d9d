use std::fmt::Display;

/// Static type of an expression, fixed when the node is built.
///
/// `Erroneous` is absorbing: an expression built from an erroneous operand is
/// itself erroneous, and nothing downstream reports about it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    SeqInt,
    SeqFloat,
    String,
    Erroneous,
}

impl Type {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_sequence(self) -> bool {
        matches!(self, Type::SeqInt | Type::SeqFloat)
    }

    pub fn is_erroneous(self) -> bool {
        self == Type::Erroneous
    }

    /// Element type of a sequence type.
    pub fn element(self) -> Option<Type> {
        match self {
            Type::SeqInt => Some(Type::Int),
            Type::SeqFloat => Some(Type::Float),
            _ => None,
        }
    }

    /// Sequence type holding elements of this type.
    pub fn sequence_of(self) -> Option<Type> {
        match self {
            Type::Int => Some(Type::SeqInt),
            Type::Float => Some(Type::SeqFloat),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::SeqInt => "seq<int>",
            Type::SeqFloat => "seq<float>",
            Type::String => "string",
            Type::Erroneous => "<error>",
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
