use string_interner::{DefaultStringInterner, DefaultSymbol};

#[derive(Debug, PartialEq, Clone)]
pub enum TypeDecl {
    Unknown,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Void,
    /// `struct` / `enum` / `union` heads, optionally named.
    Struct(Option<DefaultSymbol>),
    Enum(Option<DefaultSymbol>),
    Union(Option<DefaultSymbol>),
    /// User-defined type referenced by bare identifier.
    Identifier(DefaultSymbol),
    Pointer(Box<TypeDecl>),
}

impl TypeDecl {
    /// Stack slot size in bytes. Aggregates and unknown types fall back to
    /// a full 64-bit slot.
    pub fn size_in_bytes(&self) -> u32 {
        match self {
            TypeDecl::I8 | TypeDecl::U8 | TypeDecl::Bool => 1,
            TypeDecl::I16 | TypeDecl::U16 => 2,
            TypeDecl::I32 | TypeDecl::U32 | TypeDecl::F32 => 4,
            TypeDecl::I64 | TypeDecl::U64 | TypeDecl::F64 => 8,
            TypeDecl::Pointer(_) => 8,
            _ => 8,
        }
    }

    /// GNU assembler operand-size suffix for this type's slot.
    pub fn suffix(&self) -> &'static str {
        match self.size_in_bytes() {
            1 => "b",
            2 => "w",
            4 => "l",
            _ => "q",
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, TypeDecl::F32 | TypeDecl::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TypeDecl::I8 | TypeDecl::I16 | TypeDecl::I32 | TypeDecl::I64 | TypeDecl::F32 | TypeDecl::F64
        )
    }

    pub fn display(&self, interner: &DefaultStringInterner) -> String {
        let resolve = |sym: &DefaultSymbol| interner.resolve(*sym).unwrap_or("<unknown>").to_string();
        match self {
            TypeDecl::Unknown => "<unknown>".to_string(),
            TypeDecl::I8 => "i8".to_string(),
            TypeDecl::I16 => "i16".to_string(),
            TypeDecl::I32 => "i32".to_string(),
            TypeDecl::I64 => "i64".to_string(),
            TypeDecl::U8 => "u8".to_string(),
            TypeDecl::U16 => "u16".to_string(),
            TypeDecl::U32 => "u32".to_string(),
            TypeDecl::U64 => "u64".to_string(),
            TypeDecl::F32 => "f32".to_string(),
            TypeDecl::F64 => "f64".to_string(),
            TypeDecl::Bool => "bool".to_string(),
            TypeDecl::Void => "void".to_string(),
            TypeDecl::Struct(name) => match name {
                Some(sym) => format!("struct {}", resolve(sym)),
                None => "struct".to_string(),
            },
            TypeDecl::Enum(name) => match name {
                Some(sym) => format!("enum {}", resolve(sym)),
                None => "enum".to_string(),
            },
            TypeDecl::Union(name) => match name {
                Some(sym) => format!("union {}", resolve(sym)),
                None => "union".to_string(),
            },
            TypeDecl::Identifier(sym) => resolve(sym),
            TypeDecl::Pointer(inner) => format!("{}*", inner.display(interner)),
        }
    }
}
