//! Pure mapping from surface `TsType` syntax to [`ShaderType`] (§4.A).
//!
//! Mapping never consults a type checker: it matches on the shape of the
//! `TsType` node the parser already produced. Unknown shapes degrade to
//! `f32` with a [`Diagnostic::UnknownType`] rather than failing the whole
//! translation — mirroring `map_port_type` in the teacher's
//! `math_closure` module, lifted from string matching onto typed nodes.

use swc_ecma_ast::{TsEntityName, TsKeywordTypeKind, TsType};

use crate::diagnostics::Diagnostic;
use crate::types::{Scalar, ShaderType};

/// Map one surface type annotation. Returns the mapped type and, when the
/// surface form was not recognized, the warning diagnostic to report.
pub fn map_type(ty: &TsType) -> (ShaderType, Option<Diagnostic>) {
    match ty {
        TsType::TsKeywordType(kw) => match kw.kind {
            TsKeywordTypeKind::TsBooleanKeyword => (ShaderType::Bool, None),
            TsKeywordTypeKind::TsNumberKeyword => (
                ShaderType::F32,
                Some(Diagnostic::UnknownType {
                    surface_type: "number".to_string(),
                }),
            ),
            other => (
                ShaderType::F32,
                Some(Diagnostic::UnknownType {
                    surface_type: format!("{other:?}"),
                }),
            ),
        },
        TsType::TsTypeRef(type_ref) => map_type_ref(type_ref),
        TsType::TsParenthesizedType(inner) => map_type(&inner.type_ann),
        other => (
            ShaderType::F32,
            Some(Diagnostic::UnknownType {
                surface_type: format!("{other:?}"),
            }),
        ),
    }
}

fn map_type_ref(type_ref: &swc_ecma_ast::TsTypeRef) -> (ShaderType, Option<Diagnostic>) {
    let name = match &type_ref.type_name {
        TsEntityName::Ident(ident) => ident.sym.to_string(),
        TsEntityName::TsQualifiedName(q) => q.right.sym.to_string(),
    };

    let first_type_param = |index: usize| -> Option<&TsType> {
        type_ref
            .type_params
            .as_ref()
            .and_then(|params| params.params.get(index))
            .map(|boxed| boxed.as_ref())
    };

    match name.as_str() {
        "u32" => (ShaderType::U32, None),
        "i32" => (ShaderType::I32, None),
        "f32" => (ShaderType::F32, None),
        "vec2" | "vec2f" => (ShaderType::Vec2(Scalar::F32), None),
        "vec3" | "vec3f" => (ShaderType::Vec3(Scalar::F32), None),
        "vec4" | "vec4f" => (ShaderType::Vec4(Scalar::F32), None),
        "vec2i" => (ShaderType::Vec2(Scalar::I32), None),
        "vec3i" => (ShaderType::Vec3(Scalar::I32), None),
        "vec4i" => (ShaderType::Vec4(Scalar::I32), None),
        "vec2u" => (ShaderType::Vec2(Scalar::U32), None),
        "vec3u" => (ShaderType::Vec3(Scalar::U32), None),
        "vec4u" => (ShaderType::Vec4(Scalar::U32), None),
        "mat2x2" | "mat2x2f" => (ShaderType::Mat2x2, None),
        "mat3x3" | "mat3x3f" => (ShaderType::Mat3x3, None),
        "mat4x4" | "mat4x4f" => (ShaderType::Mat4x4, None),
        "SharedArray" => {
            let (elem, diag) = match first_type_param(0) {
                Some(inner) => map_type(inner),
                None => (
                    ShaderType::F32,
                    Some(Diagnostic::UnknownType {
                        surface_type: "SharedArray<>".to_string(),
                    }),
                ),
            };
            (ShaderType::Array(Box::new(elem)), diag)
        }
        "Atomic" => {
            let (elem, diag) = match first_type_param(0) {
                Some(inner) => map_type(inner),
                None => (
                    ShaderType::U32,
                    Some(Diagnostic::UnknownType {
                        surface_type: "Atomic<>".to_string(),
                    }),
                ),
            };
            (ShaderType::Atomic(Box::new(elem)), diag)
        }
        _ if name.chars().next().is_some_and(|c| c.is_uppercase()) => {
            (ShaderType::Struct(name), None)
        }
        _ => (
            ShaderType::F32,
            Some(Diagnostic::UnknownType { surface_type: name }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use swc_common::DUMMY_SP;
    use swc_ecma_ast::{Ident, TsKeywordType, TsTypeParamInstantiation, TsTypeRef};

    fn type_ref(name: &str, params: Vec<TsType>) -> TsType {
        TsType::TsTypeRef(TsTypeRef {
            span: DUMMY_SP,
            type_name: TsEntityName::Ident(Ident::new(name.into(), DUMMY_SP, Default::default())),
            type_params: if params.is_empty() {
                None
            } else {
                Some(Box::new(TsTypeParamInstantiation {
                    span: DUMMY_SP,
                    params: params.into_iter().map(Box::new).collect(),
                }))
            },
        })
    }

    fn keyword(kind: TsKeywordTypeKind) -> TsType {
        TsType::TsKeywordType(TsKeywordType {
            span: DUMMY_SP,
            kind,
        })
    }

    #[test]
    fn maps_scalar_keywords() {
        let (ty, diag) = map_type(&keyword(TsKeywordTypeKind::TsBooleanKeyword));
        assert_eq!(ty, ShaderType::Bool);
        assert!(diag.is_none());
    }

    #[test]
    fn number_maps_to_f32_with_warning() {
        let (ty, diag) = map_type(&keyword(TsKeywordTypeKind::TsNumberKeyword));
        assert_eq!(ty, ShaderType::F32);
        assert!(matches!(diag, Some(Diagnostic::UnknownType { .. })));
    }

    #[test]
    fn maps_vector_and_matrix_names() {
        assert_eq!(map_type(&type_ref("vec3f", vec![])).0, ShaderType::Vec3(Scalar::F32));
        assert_eq!(map_type(&type_ref("vec2i", vec![])).0, ShaderType::Vec2(Scalar::I32));
        assert_eq!(map_type(&type_ref("mat4x4", vec![])).0, ShaderType::Mat4x4);
    }

    #[test]
    fn maps_shared_array_recursively() {
        let inner = type_ref("Atomic", vec![type_ref("u32", vec![])]);
        let outer = type_ref("SharedArray", vec![inner]);
        let (ty, diag) = map_type(&outer);
        assert_eq!(
            ty,
            ShaderType::Array(Box::new(ShaderType::Atomic(Box::new(ShaderType::U32))))
        );
        assert!(diag.is_none());
    }

    #[test]
    fn unrecognized_lowercase_name_falls_back_to_f32() {
        let (ty, diag) = map_type(&type_ref("whatever", vec![]));
        assert_eq!(ty, ShaderType::F32);
        assert!(matches!(diag, Some(Diagnostic::UnknownType { .. })));
    }

    #[test]
    fn uppercase_unknown_name_is_treated_as_struct() {
        let (ty, diag) = map_type(&type_ref("Params", vec![]));
        assert_eq!(ty, ShaderType::Struct("Params".to_string()));
        assert!(diag.is_none());
    }

    proptest! {
        // map_type is a pure total function (§4.A): over any identifier
        // text, recognized or not, it must return rather than panic.
        #[test]
        fn map_type_never_panics_over_arbitrary_type_ref_names(
            name in "[A-Za-z_][A-Za-z0-9_]{0,15}"
        ) {
            let (_ty, _diag) = map_type(&type_ref(&name, vec![]));
        }

        // Nested generics (SharedArray<Atomic<T>>-shaped) must recurse
        // without panicking even when the inner name is unrecognized.
        #[test]
        fn map_type_never_panics_over_nested_generics(
            outer in "[A-Za-z_][A-Za-z0-9_]{0,10}",
            inner in "[A-Za-z_][A-Za-z0-9_]{0,10}",
        ) {
            let inner_ty = type_ref(&inner, vec![]);
            let (_ty, _diag) = map_type(&type_ref(&outer, vec![inner_ty]));
        }

        #[test]
        fn map_type_never_panics_over_keyword_kinds(variant in 0u8..3) {
            let kind = match variant {
                0 => TsKeywordTypeKind::TsBooleanKeyword,
                1 => TsKeywordTypeKind::TsNumberKeyword,
                _ => TsKeywordTypeKind::TsStringKeyword,
            };
            let (_ty, _diag) = map_type(&keyword(kind));
        }
    }
}
