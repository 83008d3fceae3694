//! Typed tree of shader resource types.
//!
//! A front end (see `spirv` module) describes every shader variable with a
//! [`TypeDescription`] in the compiler's own terms. [`reflect_type`] turns it
//! into a [`SpvType`] tree that carries byte sizes and offsets.

use std::fmt;

/// Base numeric or opaque kind of a type, as the compiler reports it.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Half,
    Int,
    UInt,
    Float,
    Int64,
    UInt64,
    Double,
    Image,
    SampledImage,
    Sampler,
    Struct,
    Unknown,
}

impl BaseKind {
    /// Size of a single component in bytes. Opaque kinds have no size.
    pub fn byte_width(self) -> u32 {
        match self {
            BaseKind::Int8 | BaseKind::UInt8 => 1,
            BaseKind::Int16 | BaseKind::UInt16 | BaseKind::Half => 2,
            BaseKind::Bool | BaseKind::Int | BaseKind::UInt | BaseKind::Float => 4,
            BaseKind::Int64 | BaseKind::UInt64 | BaseKind::Double => 8,
            BaseKind::Image
            | BaseKind::SampledImage
            | BaseKind::Sampler
            | BaseKind::Struct
            | BaseKind::Unknown => 0,
        }
    }

    /// GLSL spelling of a scalar of this kind and the prefix of its vectors.
    fn glsl(self) -> (&'static str, &'static str) {
        match self {
            BaseKind::Bool => ("bool", "b"),
            BaseKind::Int8 => ("int8_t", "i8"),
            BaseKind::UInt8 => ("uint8_t", "u8"),
            BaseKind::Int16 => ("int16_t", "i16"),
            BaseKind::UInt16 => ("uint16_t", "u16"),
            BaseKind::Half => ("float16_t", "f16"),
            BaseKind::Int => ("int", "i"),
            BaseKind::UInt => ("uint", "u"),
            BaseKind::Float => ("float", ""),
            BaseKind::Int64 => ("int64_t", "i64"),
            BaseKind::UInt64 => ("uint64_t", "u64"),
            BaseKind::Double => ("double", "d"),
            BaseKind::Image => ("image", ""),
            BaseKind::SampledImage => ("sampler", ""),
            BaseKind::Sampler => ("sampler", ""),
            BaseKind::Struct => ("struct", ""),
            BaseKind::Unknown => ("<unknown>", ""),
        }
    }
}

/// Image dimensionality.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimensionality {
    D1,
    D2,
    D3,
    Cube,
    Rect,
    Buffer,
    SubpassData,
}

/// Image traits of an image type description.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageTraits {
    /// Dimensionality.
    pub dim: Dimensionality,
    /// SPIR-V `Sampled` operand: 0 unknown, 1 used with a sampler, 2 storage image.
    pub sampled: u32,
    /// Multisampled image.
    pub multisampled: bool,
    /// Depth image.
    pub depth: bool,
    /// Arrayed image.
    pub arrayed: bool,
    /// Texel format name reported by the compiler. Empty when unknown.
    pub format: String,
}

impl Default for ImageTraits {
    fn default() -> Self {
        ImageTraits {
            dim: Dimensionality::D2,
            sampled: 1,
            multisampled: false,
            depth: false,
            arrayed: false,
            format: String::new(),
        }
    }
}

/// Compiler-provided description of the type of one shader variable or struct member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescription {
    /// Variable or member name.
    pub name: String,
    /// Base kind.
    pub base: BaseKind,
    /// Number of components of a vector, or rows of a matrix. 1 for scalars.
    pub vector_size: u32,
    /// Number of matrix columns. 1 for non-matrices.
    pub columns: u32,
    /// Matrix column stride in bytes if the layout declares one.
    pub matrix_stride: u32,
    /// Array dimensions, innermost first. 0 marks a runtime-sized dimension.
    pub array_dims: Vec<u32>,
    /// Byte step between array elements if the layout declares one.
    pub array_stride: u32,
    /// Image traits. Present for image kinds.
    pub image: Option<ImageTraits>,
    /// Members of a struct.
    pub members: Vec<TypeDescription>,
    /// Byte offset inside the enclosing struct.
    pub offset: u32,
    /// Declared size in bytes of a single struct element.
    pub size: u32,
}

impl TypeDescription {
    /// Scalar of the given kind.
    pub fn scalar(base: BaseKind) -> Self {
        TypeDescription {
            name: String::new(),
            base,
            vector_size: 1,
            columns: 1,
            matrix_stride: 0,
            array_dims: Vec::new(),
            array_stride: 0,
            image: None,
            members: Vec::new(),
            offset: 0,
            size: 0,
        }
    }

    /// Vector with `length` components.
    pub fn vector(base: BaseKind, length: u32) -> Self {
        TypeDescription {
            vector_size: length,
            ..Self::scalar(base)
        }
    }

    /// Matrix of `columns` column vectors with `rows` components each.
    pub fn matrix(base: BaseKind, rows: u32, columns: u32) -> Self {
        TypeDescription {
            vector_size: rows,
            columns,
            ..Self::scalar(base)
        }
    }

    /// Struct with the declared layout size.
    pub fn structure(members: Vec<TypeDescription>, size: u32) -> Self {
        TypeDescription {
            members,
            size,
            ..Self::scalar(BaseKind::Struct)
        }
    }

    /// Image or combined image-sampler.
    pub fn image(base: BaseKind, traits: ImageTraits) -> Self {
        TypeDescription {
            image: Some(traits),
            ..Self::scalar(base)
        }
    }

    /// Set name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set offset inside the enclosing struct.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Set array dimensions, innermost first.
    pub fn with_array(mut self, dims: Vec<u32>) -> Self {
        self.array_dims = dims;
        self
    }

    /// Set array element stride.
    pub fn with_array_stride(mut self, stride: u32) -> Self {
        self.array_stride = stride;
        self
    }

    /// Set matrix column stride.
    pub fn with_matrix_stride(mut self, stride: u32) -> Self {
        self.matrix_stride = stride;
        self
    }

    /// Checks if the description is an image kind.
    pub fn is_image(&self) -> bool {
        match self.base {
            BaseKind::Image | BaseKind::SampledImage => true,
            _ => false,
        }
    }
}

/// A type reflection error.
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum ReflectTypeError {
    /// Image kind without image traits.
    #[fail(display = "image type '{}' has no image traits", _0)]
    MissingImageTraits(String),

    /// Struct without members.
    #[fail(display = "struct '{}' has no members", _0)]
    EmptyStruct(String),
}

/// Vector or scalar.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorType {
    /// Component kind.
    pub base: BaseKind,
    /// Number of components. 1 for scalars.
    pub length: u32,
    /// Size in bytes.
    pub size: u32,
}

/// Matrix of column vectors.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixType {
    /// Component kind.
    pub base: BaseKind,
    /// Components per column.
    pub rows: u32,
    /// Number of columns.
    pub columns: u32,
    /// Size in bytes.
    pub size: u32,
}

/// Opaque image.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageType {
    /// Dimensionality.
    pub dimensionality: Dimensionality,
    /// Sampled image if `true`, storage image otherwise.
    pub sampled: bool,
    /// Multisampled.
    pub multisampled: bool,
    /// Depth image.
    pub depth: bool,
    /// Arrayed image.
    pub arrayed: bool,
    /// Texel format name. Empty when unknown.
    pub format: String,
}

/// One array dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayDim {
    /// Number of elements. Runtime-sized dimensions count as 1.
    pub length: u32,
    /// Runtime-sized dimension.
    pub is_unsized: bool,
}

/// Array of equally typed elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayType {
    /// Dimensions, outermost first.
    pub dims: Vec<ArrayDim>,
    /// Element type.
    pub subtype: Box<SpvType>,
    /// Byte step between consecutive elements, all dimensions flattened.
    /// Equals `subtype.size()` unless the layout pads elements.
    pub stride: u32,
    /// Size in bytes, `stride * product(dims.length)`.
    pub size: u32,
}

impl ArrayType {
    /// Total number of elements across all dimensions.
    pub fn element_count(&self) -> u32 {
        self.dims.iter().map(|dim| dim.length).product()
    }
}

/// Struct member.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct StructMember {
    /// Member type.
    pub ty: SpvType,
    /// Member name.
    pub name: String,
    /// Byte offset from the start of the struct.
    pub offset: u32,
}

/// Struct with compiler-declared layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct StructType {
    /// Members in declaration order.
    pub members: Vec<StructMember>,
    /// Declared size in bytes.
    pub size: u32,
}

/// Reflected type of a shader resource.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum SpvType {
    Vector(VectorType),
    Matrix(MatrixType),
    Image(ImageType),
    Array(ArrayType),
    Struct(StructType),
}

impl SpvType {
    /// Size in bytes.
    pub fn size(&self) -> u32 {
        match self {
            SpvType::Vector(v) => v.size,
            SpvType::Matrix(m) => m.size,
            SpvType::Image(_) => 0,
            SpvType::Array(a) => a.size,
            SpvType::Struct(s) => s.size,
        }
    }

    /// Get struct if this is a struct.
    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            SpvType::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Get image if this is an image.
    pub fn as_image(&self) -> Option<&ImageType> {
        match self {
            SpvType::Image(i) => Some(i),
            _ => None,
        }
    }

    /// Visit every non-composite node with its path and absolute byte offset.
    /// Array elements are visited one by one.
    pub fn walk(&self, name: &str, offset: u32, f: &mut impl FnMut(&str, u32, &SpvType)) {
        match self {
            SpvType::Struct(s) => {
                for member in &s.members {
                    let path = if name.is_empty() {
                        member.name.clone()
                    } else {
                        format!("{}.{}", name, member.name)
                    };
                    member.ty.walk(&path, offset + member.offset, f);
                }
            }
            SpvType::Array(a) => {
                for index in 0..a.element_count() {
                    let path = format!("{}[{}]", name, index);
                    a.subtype.walk(&path, offset + index * a.stride, f);
                }
            }
            leaf => f(name, offset, leaf),
        }
    }

    /// GLSL-like spelling of the type.
    pub fn describe(&self) -> String {
        match self {
            SpvType::Vector(v) => {
                let (scalar, prefix) = v.base.glsl();
                if v.length <= 1 {
                    scalar.to_string()
                } else {
                    format!("{}vec{}", prefix, v.length)
                }
            }
            SpvType::Matrix(m) => {
                let (_, prefix) = m.base.glsl();
                if m.rows == m.columns {
                    format!("{}mat{}", prefix, m.columns)
                } else {
                    format!("{}mat{}x{}", prefix, m.columns, m.rows)
                }
            }
            SpvType::Image(i) => {
                let dim = match i.dimensionality {
                    Dimensionality::D1 => "1D",
                    Dimensionality::D2 => "2D",
                    Dimensionality::D3 => "3D",
                    Dimensionality::Cube => "Cube",
                    Dimensionality::Rect => "2DRect",
                    Dimensionality::Buffer => "Buffer",
                    Dimensionality::SubpassData => "SubpassInput",
                };
                format!(
                    "{}{}{}{}{}",
                    if i.sampled { "sampler" } else { "image" },
                    dim,
                    if i.multisampled { "MS" } else { "" },
                    if i.arrayed { "Array" } else { "" },
                    if i.depth && i.sampled { "Shadow" } else { "" },
                )
            }
            SpvType::Array(a) => {
                let mut out = a.subtype.describe();
                for dim in &a.dims {
                    if dim.is_unsized {
                        out.push_str("[]");
                    } else {
                        out.push_str(&format!("[{}]", dim.length));
                    }
                }
                out
            }
            SpvType::Struct(s) => {
                let members: Vec<_> = s
                    .members
                    .iter()
                    .map(|m| format!("{} {}", m.ty.describe(), m.name))
                    .collect();
                format!("struct {{ {} }}", members.join("; "))
            }
        }
    }
}

impl fmt::Display for SpvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Build the typed tree for one variable.
///
/// Resolution order is image, struct, array, matrix, vector.
/// A struct that carries array dimensions resolves as an array of that struct.
pub fn reflect_type(desc: &TypeDescription) -> Result<SpvType, ReflectTypeError> {
    reflect_unwrapped(desc, false)
}

fn reflect_unwrapped(desc: &TypeDescription, unwrapped: bool) -> Result<SpvType, ReflectTypeError> {
    if desc.is_image() {
        let traits = desc
            .image
            .as_ref()
            .ok_or_else(|| ReflectTypeError::MissingImageTraits(desc.name.clone()))?;
        return Ok(SpvType::Image(ImageType {
            dimensionality: traits.dim,
            sampled: traits.sampled != 2,
            multisampled: traits.multisampled,
            depth: traits.depth,
            arrayed: traits.arrayed,
            format: traits.format.clone(),
        }));
    }

    if desc.base == BaseKind::Struct && (unwrapped || desc.array_dims.is_empty()) {
        if desc.members.is_empty() {
            return Err(ReflectTypeError::EmptyStruct(desc.name.clone()));
        }
        let members = desc
            .members
            .iter()
            .map(|member| {
                Ok(StructMember {
                    ty: reflect_type(member)?,
                    name: member.name.clone(),
                    offset: member.offset,
                })
            })
            .collect::<Result<Vec<_>, ReflectTypeError>>()?;
        return Ok(SpvType::Struct(StructType {
            members,
            size: desc.size,
        }));
    }

    if !unwrapped && !desc.array_dims.is_empty() {
        let subtype = reflect_unwrapped(desc, true)?;
        let dims: Vec<_> = desc
            .array_dims
            .iter()
            .rev()
            .map(|&length| match length {
                0 => ArrayDim {
                    length: 1,
                    is_unsized: true,
                },
                length => ArrayDim {
                    length,
                    is_unsized: false,
                },
            })
            .collect();
        let count: u32 = dims.iter().map(|dim| dim.length).product();
        let stride = if desc.array_stride > 0 {
            desc.array_stride
        } else {
            subtype.size()
        };
        return Ok(SpvType::Array(ArrayType {
            size: stride * count,
            stride,
            dims,
            subtype: Box::new(subtype),
        }));
    }

    let width = desc.base.byte_width();
    if desc.columns > 1 {
        let size = if desc.matrix_stride > 0 {
            desc.matrix_stride * desc.columns
        } else {
            width * desc.vector_size * desc.columns
        };
        return Ok(SpvType::Matrix(MatrixType {
            base: desc.base,
            rows: desc.vector_size,
            columns: desc.columns,
            size,
        }));
    }

    Ok(SpvType::Vector(VectorType {
        base: desc.base,
        length: desc.vector_size,
        size: width * desc.vector_size.max(1),
    }))
}
