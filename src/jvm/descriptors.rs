use super::{BinaryName, Error, Name};
use crate::util::Width;
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to their string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

/// Type of a parameter, return value, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Object(BinaryName),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn is_reference(&self) -> bool {
        !matches!(self, FieldType::Base(_))
    }

    pub fn slot_kind(&self) -> SlotKind {
        match self {
            FieldType::Base(BaseType::Long) => SlotKind::Long,
            FieldType::Base(BaseType::Double) => SlotKind::Double,
            FieldType::Base(BaseType::Float) => SlotKind::Float,
            FieldType::Base(_) => SlotKind::Int,
            FieldType::Object(_) | FieldType::Array(_) => SlotKind::Reference,
        }
    }

    /// Read one field type, leaving the rest of the input alone
    fn parse_from(source: &mut Peekable<Chars<'_>>) -> Result<FieldType, String> {
        let typ = match source.next() {
            Some('B') => FieldType::Base(BaseType::Byte),
            Some('C') => FieldType::Base(BaseType::Char),
            Some('D') => FieldType::Base(BaseType::Double),
            Some('F') => FieldType::Base(BaseType::Float),
            Some('I') => FieldType::Base(BaseType::Int),
            Some('J') => FieldType::Base(BaseType::Long),
            Some('S') => FieldType::Base(BaseType::Short),
            Some('Z') => FieldType::Base(BaseType::Boolean),
            Some('L') => {
                let mut class_name = String::new();
                loop {
                    match source.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => return Err(format!("missing terminator for 'L{}'", class_name)),
                    }
                }
                FieldType::Object(BinaryName::from_string(class_name)?)
            }
            Some('[') => FieldType::Array(Box::new(FieldType::parse_from(source)?)),
            Some(c) => return Err(format!("invalid type character '{}'", c)),
            None => return Err(String::from("missing type")),
        };
        Ok(typ)
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Object(class_name) => {
                write_to.push('L');
                write_to.push_str(class_name.as_str());
                write_to.push(';');
            }
            FieldType::Array(element_type) => {
                write_to.push('[');
                element_type.render_to(write_to);
            }
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl MethodDescriptor {
    /// Parse a method descriptor such as `(ILjava/lang/String;)V`
    pub fn parse_method(source: &str) -> Result<MethodDescriptor, Error> {
        let bad = |msg: String| Error::BadDescriptor(format!("'{}': {}", source, msg));
        let mut chars = source.chars().peekable();

        if chars.next() != Some('(') {
            return Err(bad(String::from("expected '(' for method")));
        }
        let mut parameters = vec![];
        loop {
            match chars.peek() {
                Some(')') => {
                    chars.next();
                    break;
                }
                Some(_) => parameters.push(FieldType::parse_from(&mut chars).map_err(bad)?),
                None => return Err(bad(String::from("expected ')' for method"))),
            }
        }

        let return_type = if chars.peek() == Some(&'V') {
            chars.next();
            None
        } else {
            Some(FieldType::parse_from(&mut chars).map_err(bad)?)
        };
        if let Some(c) = chars.next() {
            return Err(bad(format!("unexpected leftover input '{}'", c)));
        }

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// Total length of parameters in local variable slots (not the same as the length of the
    /// vector), which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        let parameters_len: usize = self
            .parameters
            .iter()
            .map(|parameter| parameter.slot_kind().width())
            .sum();
        this_len + parameters_len
    }

    /// Descriptor of a static method taking an explicit receiver ahead of the parameters of this
    /// (instance) method
    pub fn with_receiver(&self, receiver: FieldType) -> MethodDescriptor {
        let mut parameters = Vec::with_capacity(self.parameters.len() + 1);
        parameters.push(receiver);
        parameters.extend(self.parameters.iter().cloned());
        MethodDescriptor {
            parameters,
            return_type: self.return_type.clone(),
        }
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

/// How a value of some type sits in local variables and on the operand stack
///
/// This is what decides which load, store, and return instruction variant applies: everything
/// narrower than `int` is handled as an `int`, and all references share one set of instructions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum SlotKind {
    Int,
    Float,
    Long,
    Double,
    Reference,
}

impl Width for SlotKind {
    fn width(&self) -> usize {
        match self {
            SlotKind::Long | SlotKind::Double => 2,
            _ => 1,
        }
    }
}
