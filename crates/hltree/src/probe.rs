//! Equality probes shared by type classification and reference matching.
//!
//! The store exposes no tag for a string's character-set convention or a
//! datatype's native name, so both are recovered by building candidates
//! and comparing them with the value at hand. References are matched the
//! same way, by comparing bytes.

use hltree_format::ObjectReference;

/// Key of the first candidate equal to `target`.
pub(crate) fn first_equal<K, T: PartialEq>(
    target: &T,
    candidates: impl IntoIterator<Item = (K, T)>,
) -> Option<K> {
    candidates
        .into_iter()
        .find(|(_, candidate)| candidate == target)
        .map(|(key, _)| key)
}

/// True when two references point at the same object.
pub(crate) fn same_reference(a: &ObjectReference, b: &ObjectReference) -> bool {
    a.as_bytes() == b.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hltree_format::ObjectId;

    #[test]
    fn first_equal_prefers_earlier_keys() {
        let table = [("a", 1), ("b", 2), ("c", 2)];
        assert_eq!(first_equal(&2, table), Some("b"));
        assert_eq!(first_equal(&9, table), None);
    }

    #[test]
    fn references_compare_bytes() {
        let a = ObjectReference::to_object(ObjectId(3));
        assert!(same_reference(&a, &ObjectReference::to_object(ObjectId(3))));
        assert!(!same_reference(&a, &ObjectReference::to_object(ObjectId(4))));
    }
}
