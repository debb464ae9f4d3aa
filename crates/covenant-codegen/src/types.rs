use covenant_ast::DataType;

/// Lower an abstract data type to Solidity type text.
///
/// Total and deterministic. `payable` affects only Identity leaves; Mapping
/// and Sequence recurse structurally, propagating the flag into value and
/// element positions.
pub fn lower(ty: &DataType, payable: bool) -> String {
    match ty {
        DataType::Identity => {
            if payable {
                "address payable".to_string()
            } else {
                "address".to_string()
            }
        }
        // No unsigned type exists in the source language; integers carry
        // monetary amounts validated non-negative upstream and must interact
        // with msg.value and transfer, so they lower unsigned.
        DataType::Int | DataType::Timestamp | DataType::Timespan => "uint".to_string(),
        DataType::String => "string".to_string(),
        DataType::Bool => "bool".to_string(),
        DataType::Mapping(key, value) => {
            format!("mapping({} => {})", lower(key, false), lower(value, payable))
        }
        DataType::Sequence(elem) => format!("{}[]", lower(elem, payable)),
    }
}

/// Deterministic mangling of a type for synthesized helper names.
/// Int, Timestamp, and Timespan share the `uint` lowering, so they share a tag.
pub fn type_tag(ty: &DataType) -> String {
    match ty {
        DataType::Identity => "address".to_string(),
        DataType::Int | DataType::Timestamp | DataType::Timespan => "uint".to_string(),
        DataType::String => "string".to_string(),
        DataType::Bool => "bool".to_string(),
        DataType::Mapping(key, value) => {
            format!("mapping_{}_{}", type_tag(key), type_tag(value))
        }
        DataType::Sequence(elem) => format!("{}_array", type_tag(elem)),
    }
}

/// True for types whose function parameters need an explicit data location.
pub fn needs_memory_location(ty: &DataType) -> bool {
    matches!(ty, DataType::String | DataType::Sequence(_) | DataType::Mapping(_, _))
}
