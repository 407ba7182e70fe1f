//! The attribute engine: building and searching the `SET OF Attribute`
//! layout CMS uses for signed and unsigned attributes.
//!
//! Outbound attributes are assembled through `x509_cert::attr::Attributes`
//! (a `SetOfVec<Attribute>`), which already performs the "size every
//! sub-SEQUENCE, then flatten" two-pass scheme at encode time — that's
//! exactly what `der`'s `Sequence`/`SetOfVec` machinery does. One
//! deliberate departure from the wolfSSL original this crate grew out of:
//! `SetOfVec::insert` keeps elements in ascending DER order rather than
//! raw insertion order. The three canonical synthesized attributes
//! (ContentType, MessageDigest, SigningTime) are required to precede any
//! caller-supplied ones, and their OIDs already sort into exactly that
//! order, so strict DER-SET ordering and insertion order agree for the
//! case this crate actually constructs. See `DESIGN.md` for the record
//! of this decision.
//!
//! Inbound attributes are parsed into a `Vec<Attribute>` in DER (ascending
//! OID) order; [`DecodedAttributes::head_first`] exposes them reversed to
//! preserve the "most recently parsed is first" contract a prepend-at-head
//! linked list would give callers.

use der::asn1::{Any, ObjectIdentifier, SetOfVec};
use x509_cert::attr::{Attribute, Attributes};

/// A single outbound attribute: an OID and exactly one value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pkcs7Attribute {
    pub oid: ObjectIdentifier,
    pub value: Any,
}

impl Pkcs7Attribute {
    pub fn new(oid: ObjectIdentifier, value: Any) -> Self {
        Self { oid, value }
    }
}

/// Build the `SET OF Attribute` layout from an ordered list of outbound
/// attributes. Equal-OID duplicates are permitted on the wire but this
/// builder never synthesizes one itself.
pub fn build_attribute_set(attrs: &[Pkcs7Attribute]) -> der::Result<Attributes> {
    let mut set = SetOfVec::new();
    for attr in attrs {
        let mut values = SetOfVec::new();
        values.insert(attr.value.clone())?;
        set.insert(Attribute {
            oid: attr.oid,
            values,
        })?;
    }
    Ok(set)
}

/// Look up the first `Attribute` with a given OID. Lookup compares only
/// the OID's value octets.
pub fn find_attribute<'a>(attrs: &'a Attributes, oid: &ObjectIdentifier) -> Option<&'a Attribute> {
    attrs.iter().find(|a| &a.oid == oid)
}

/// The first value of an attribute, DER-encoded including its tag and
/// length, for callers that want to inspect a specific attribute's value.
pub fn attribute_value_der(attrs: &Attributes, oid: &ObjectIdentifier) -> Option<Vec<u8>> {
    use der::Encode;
    find_attribute(attrs, oid)
        .and_then(|a| a.values.iter().next())
        .and_then(|v| v.to_der().ok())
}

/// Inbound attributes, preserved in decode order.
#[derive(Clone, Debug, Default)]
pub struct DecodedAttributes(Vec<Attribute>);

impl DecodedAttributes {
    pub fn from_der_order(attrs: Attributes) -> Self {
        Self(attrs.into_vec())
    }

    /// Attributes in the order they were DER-decoded (ascending OID).
    pub fn der_order(&self) -> &[Attribute] {
        &self.0
    }

    /// Attributes reversed so the most recently parsed is first.
    pub fn head_first(&self) -> Vec<&Attribute> {
        self.0.iter().rev().collect()
    }

    /// Search by OID; returns the first match in decode order.
    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.0.iter().find(|a| &a.oid == oid)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use const_oid::db::rfc5911::{ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, ID_SIGNING_TIME};

    fn any_octet(bytes: &[u8]) -> Any {
        der::asn1::OctetStringRef::new(bytes).unwrap().into()
    }

    #[test]
    fn canonical_attribute_order_matches_insertion() {
        let attrs = vec![
            Pkcs7Attribute::new(ID_CONTENT_TYPE, any_octet(b"a")),
            Pkcs7Attribute::new(ID_MESSAGE_DIGEST, any_octet(b"b")),
            Pkcs7Attribute::new(ID_SIGNING_TIME, any_octet(b"c")),
        ];
        let set = build_attribute_set(&attrs).unwrap();
        let oids: Vec<_> = set.iter().map(|a| a.oid).collect();
        assert_eq!(oids, vec![ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, ID_SIGNING_TIME]);
    }

    #[test]
    fn find_by_oid() {
        let attrs = vec![Pkcs7Attribute::new(ID_CONTENT_TYPE, any_octet(b"x"))];
        let set = build_attribute_set(&attrs).unwrap();
        assert!(find_attribute(&set, &ID_CONTENT_TYPE).is_some());
        assert!(find_attribute(&set, &ID_SIGNING_TIME).is_none());
    }

    #[test]
    fn decoded_attributes_head_first_reverses_decode_order() {
        let attrs = vec![
            Pkcs7Attribute::new(ID_CONTENT_TYPE, any_octet(b"a")),
            Pkcs7Attribute::new(ID_MESSAGE_DIGEST, any_octet(b"b")),
        ];
        let set = build_attribute_set(&attrs).unwrap();
        let decoded = DecodedAttributes::from_der_order(set);
        let head_first: Vec<_> = decoded.head_first().into_iter().map(|a| a.oid).collect();
        assert_eq!(head_first, vec![ID_MESSAGE_DIGEST, ID_CONTENT_TYPE]);
    }
}
