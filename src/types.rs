//! Shared descriptor types produced by the Type Mapper and consumed by
//! every later stage (struct synthesis, translation, emission).

/// Target shader language type, the Type Mapper's output domain.
///
/// Unlike the teacher's `ValueType` this is open-ended: `Struct` holds an
/// arbitrary name because the surface language can declare any number of
/// record types, not a fixed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShaderType {
    F32,
    I32,
    U32,
    Bool,
    Vec2(Scalar),
    Vec3(Scalar),
    Vec4(Scalar),
    Mat2x2,
    Mat3x3,
    Mat4x4,
    /// Runtime-length array, from `SharedArray<T>`.
    Array(Box<ShaderType>),
    /// `Atomic<T>`.
    Atomic(Box<ShaderType>),
    Struct(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scalar {
    F32,
    I32,
    U32,
}

impl Scalar {
    pub fn wgsl(self) -> &'static str {
        match self {
            Scalar::F32 => "f32",
            Scalar::I32 => "i32",
            Scalar::U32 => "u32",
        }
    }
}

impl ShaderType {
    /// Render this type as it would appear in an emitted shader.
    pub fn wgsl(&self) -> String {
        match self {
            ShaderType::F32 => "f32".to_string(),
            ShaderType::I32 => "i32".to_string(),
            ShaderType::U32 => "u32".to_string(),
            ShaderType::Bool => "bool".to_string(),
            ShaderType::Vec2(s) => format!("vec2<{}>", s.wgsl()),
            ShaderType::Vec3(s) => format!("vec3<{}>", s.wgsl()),
            ShaderType::Vec4(s) => format!("vec4<{}>", s.wgsl()),
            ShaderType::Mat2x2 => "mat2x2<f32>".to_string(),
            ShaderType::Mat3x3 => "mat3x3<f32>".to_string(),
            ShaderType::Mat4x4 => "mat4x4<f32>".to_string(),
            ShaderType::Array(elem) => format!("array<{}>", elem.wgsl()),
            ShaderType::Atomic(elem) => format!("atomic<{}>", elem.wgsl()),
            ShaderType::Struct(name) => name.clone(),
        }
    }

    /// True for `SharedArray<T>`-derived types; these bind as storage,
    /// everything else binds as uniform (§4.D).
    pub fn is_array(&self) -> bool {
        matches!(self, ShaderType::Array(_))
    }

    /// The struct names this type directly references, for closure
    /// computation in the Struct Synthesizer (§4.B).
    pub fn referenced_struct(&self) -> Option<&str> {
        match self {
            ShaderType::Struct(name) => Some(name.as_str()),
            ShaderType::Array(inner) | ShaderType::Atomic(inner) => inner.referenced_struct(),
            _ => None,
        }
    }
}

/// How a parameter's buffer is exposed to the shader entry function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    StorageReadWrite,
}

impl ShaderType {
    pub fn binding_kind(&self) -> BindingKind {
        if self.is_array() {
            BindingKind::StorageReadWrite
        } else {
            BindingKind::Uniform
        }
    }
}

/// Which entry-point stage a function annotation selects (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Kernel,
    Vertex,
    Fragment,
}

/// One parameter of an annotated function, after type mapping (§3).
#[derive(Clone, Debug)]
pub struct ParamDescriptor {
    pub name: String,
    pub surface_type: String,
    pub mapped_type: ShaderType,
    pub binding_index: u32,
}

impl ParamDescriptor {
    pub fn binding_kind(&self) -> BindingKind {
        self.mapped_type.binding_kind()
    }
}

/// A struct field in source declaration order (§3).
#[derive(Clone, Debug)]
pub struct StructField {
    pub name: String,
    pub mapped_type: ShaderType,
}

/// A struct the emitted shader must declare before any binding that
/// references it (§3 invariant 4, §4.B).
#[derive(Clone, Debug)]
pub struct StructDescriptor {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl StructDescriptor {
    pub fn wgsl(&self) -> String {
        let mut out = format!("struct {} {{\n", self.name);
        for (i, field) in self.fields.iter().enumerate() {
            out.push_str("    ");
            out.push_str(&field.name);
            out.push_str(" : ");
            out.push_str(&field.mapped_type.wgsl());
            if i + 1 < self.fields.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

/// A top-level numeric-literal `const` binding, copied verbatim into
/// every generated shader (§3).
#[derive(Clone, Debug)]
pub struct GlobalConstDescriptor {
    pub name: String,
    pub mapped_type: ShaderType,
    pub literal: String,
}

impl GlobalConstDescriptor {
    pub fn wgsl(&self) -> String {
        format!(
            "const {} : {} = {};\n",
            self.name,
            self.mapped_type.wgsl(),
            self.literal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_binds_storage_others_bind_uniform() {
        assert_eq!(
            ShaderType::Array(Box::new(ShaderType::F32)).binding_kind(),
            BindingKind::StorageReadWrite
        );
        assert_eq!(ShaderType::F32.binding_kind(), BindingKind::Uniform);
        assert_eq!(
            ShaderType::Struct("Params".into()).binding_kind(),
            BindingKind::Uniform
        );
    }

    #[test]
    fn referenced_struct_recurses_through_array_and_atomic() {
        let ty = ShaderType::Array(Box::new(ShaderType::Atomic(Box::new(ShaderType::Struct(
            "Foo".into(),
        )))));
        assert_eq!(ty.referenced_struct(), Some("Foo"));
        assert_eq!(ShaderType::F32.referenced_struct(), None);
    }

    #[test]
    fn struct_wgsl_renders_fields_in_order() {
        let s = StructDescriptor {
            name: "Params".into(),
            fields: vec![
                StructField {
                    name: "width".into(),
                    mapped_type: ShaderType::U32,
                },
                StructField {
                    name: "time".into(),
                    mapped_type: ShaderType::F32,
                },
            ],
        };
        assert_eq!(s.wgsl(), "struct Params {\n    width : u32,\n    time : f32\n}\n");
    }
}
