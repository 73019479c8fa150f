//! Unit tests for the OTS wire model

use super::constants::*;
use super::*;
use crate::att::AttErrorCode;
use crate::gatt::Uuid;

#[test]
fn test_object_id_validity() {
    assert!(!ObjectId::INVALID.is_valid());
    assert!(!ObjectId::default().is_valid());
    assert!(ObjectId::DIRECTORY_LISTING.is_valid());
    assert!(ObjectId::from_u64(0x100).is_valid());

    // Usable bytes decide validity regardless of the RFU byte
    assert!(ObjectId::new([1, 0, 0, 0, 0], OBJECT_ID_RFU_INVALID).is_valid());
    assert!(!ObjectId::new([0; 5], 0x42).is_valid());

    let mut object = ObjectId::from_u64(7);
    object.set_invalid();
    assert_eq!(object, ObjectId::INVALID);
}

#[test]
fn test_object_id_wire_layout() {
    let object = ObjectId::from_u64(0x0000_0102_0304_0506);
    assert_eq!(object.to_bytes(), [0x06, 0x05, 0x04, 0x03, 0x02, 0x00]);
    assert_eq!(ObjectId::from_bytes(&object.to_bytes()), Some(object));
    assert_eq!(object.to_u64(), 0x02_0304_0506);
    assert_eq!(ObjectId::from_bytes(&[0; 5]), None);
    assert_eq!(object.to_string(), "0x000203040506");
}

#[test]
fn test_date_time_ordering() {
    let early = DateTime::new(2023, 12, 31, 23, 59, 59);
    let late = DateTime::new(2024, 1, 1, 0, 0, 0);
    assert!(early < late);
    assert!(DateTime::new(2024, 1, 1, 0, 0, 1) > late);
    assert_eq!(late.encode(), vec![0xE8, 0x07, 1, 1, 0, 0, 0]);
    assert_eq!(DateTime::decode(&late.encode()), Some(late));
    assert_eq!(DateTime::decode(&[0xE8, 0x07, 1]), None);
}

#[test]
fn test_features_encoding() {
    let features = OtsFeatures {
        oacp: OacpFeatures::READ | OacpFeatures::WRITE | OacpFeatures::PATCH,
        olcp: OlcpFeatures::GO_TO,
    };
    let bytes = features.encode();
    assert_eq!(bytes, vec![0x30, 0x01, 0, 0, 0x01, 0, 0, 0]);
    assert_eq!(OtsFeatures::decode(&bytes), Some(features));
    assert_eq!(OtsFeatures::decode(&bytes[..7]), None);
}

#[test]
fn test_oacp_request_decode() {
    let read = OacpRequest::decode(&[0x05, 0, 0, 0, 0, 100, 0, 0, 0]).unwrap();
    assert_eq!(read, OacpRequest::Read { offset: 0, length: 100 });

    let write = OacpRequest::decode(&[0x06, 4, 0, 0, 0, 8, 0, 0, 0, 0x02]).unwrap();
    assert_eq!(
        write,
        OacpRequest::Write {
            offset: 4,
            length: 8,
            mode: WriteMode::TRUNCATE,
        }
    );

    let create = OacpRequest::decode(&[0x01, 0x10, 0, 0, 0, 0xAB, 0xCD]).unwrap();
    assert_eq!(
        create,
        OacpRequest::Create {
            size: 16,
            object_type: Uuid::Uuid16(0xCDAB),
        }
    );

    assert_eq!(
        OacpRequest::decode(&[0x04, 1, 2, 3]),
        Some(OacpRequest::Execute {
            parameter: vec![1, 2, 3]
        })
    );
    assert_eq!(OacpRequest::decode(&[0x05, 0, 0]), None);
    assert_eq!(OacpRequest::decode(&[0x02, 0]), None);
    assert_eq!(OacpRequest::decode(&[0x08]), None);
    assert_eq!(OacpRequest::decode(&[]), None);
}

#[test]
fn test_oacp_request_encode() {
    let request = OacpRequest::Write {
        offset: 0x10,
        length: 0x20,
        mode: WriteMode::empty(),
    };
    assert_eq!(request.encode(), vec![0x06, 0x10, 0, 0, 0, 0x20, 0, 0, 0, 0]);
    assert_eq!(OacpRequest::Abort.encode(), vec![0x07]);
    assert!(WriteMode::from_bits_retain(0x01).has_reserved_bits());
    assert!(!WriteMode::TRUNCATE.has_reserved_bits());
}

#[test]
fn test_oacp_response() {
    let mut response = OacpResponse::new(OACP_OPCODE_CALCULATE_CHECKSUM, OacpResultCode::Success);
    response.data = 0xDEADBEEFu32.to_le_bytes().to_vec();
    let bytes = response.encode();
    assert_eq!(bytes[..3], [0x60, 0x03, 0x01]);

    let decoded = OacpResponse::decode(&bytes).unwrap();
    assert_eq!(decoded.checksum(), Some(0xDEADBEEF));
    assert_eq!(OacpResponse::decode(&[0x60, 0x05]), None);
    assert_eq!(OacpResponse::decode(&[0x70, 0x05, 0x01]), None);
    assert_eq!(OacpResponse::decode(&[0x60, 0x05, 0x42]), None);
}

#[test]
fn test_olcp_request_decode() {
    assert_eq!(OlcpRequest::decode(&[0x01]), Some(OlcpRequest::First));
    assert_eq!(OlcpRequest::decode(&[0x01, 0x00]), None);
    assert_eq!(
        OlcpRequest::decode(&[0x06, 0x13]),
        Some(OlcpRequest::Order(SortOrder::CurrentSizeDescending))
    );
    assert_eq!(OlcpRequest::decode(&[0x06, 0x06]), None);
    let goto = OlcpRequest::GoTo(ObjectId::from_u64(9));
    assert_eq!(OlcpRequest::decode(&goto.encode()), Some(goto));
    assert!(OlcpOpcode::Next.needs_selection());
    assert!(!OlcpOpcode::GoTo.needs_selection());
}

#[test]
fn test_olcp_response() {
    let response = OlcpResponse {
        request_opcode: OLCP_OPCODE_REQUEST_NUMBER_OF_OBJECTS,
        result: OlcpResultCode::Success,
        number_of_objects: Some(3),
    };
    let bytes = response.encode();
    assert_eq!(bytes, vec![0x70, 0x07, 0x01, 3, 0, 0, 0]);
    assert_eq!(OlcpResponse::decode(&bytes), Some(response));

    // A successful count response without the count is malformed
    assert_eq!(OlcpResponse::decode(&bytes[..3]), None);
    assert!(OlcpResponse::decode(&[0x70, 0x07, 0x02]).is_some());
    assert!(OlcpResponse::decode(&[0x70, 0x01, 0x01, 0x00]).is_none());
}

#[test]
fn test_filter_decode() {
    assert_eq!(
        ObjectListFilter::decode(&[FILTER_NO_FILTER]),
        Ok(ObjectListFilter::NoFilter)
    );
    assert_eq!(
        ObjectListFilter::decode(&[FILTER_NO_FILTER, 0]),
        Err(AttErrorCode::InvalidAttributeValueLength)
    );
    assert_eq!(
        ObjectListFilter::decode(&[]),
        Err(AttErrorCode::InvalidAttributeValueLength)
    );
    assert_eq!(
        ObjectListFilter::decode(&[FILTER_NAME_CONTAINS, b'l', b'o', b'g']),
        Ok(ObjectListFilter::NameContains(b"log".to_vec()))
    );
    assert_eq!(
        ObjectListFilter::decode(&[FILTER_OBJECT_TYPE, 0x00]),
        Err(AttErrorCode::InvalidAttributeValueLength)
    );
    assert_eq!(
        ObjectListFilter::decode(&[0x0B]),
        Err(AttErrorCode::WriteRequestRejected)
    );
}

#[test]
fn test_filter_ranges() {
    let from = DateTime::new(2024, 1, 1, 0, 0, 0);
    let to = DateTime::new(2023, 1, 1, 0, 0, 0);
    let mut value = vec![FILTER_CREATED_BETWEEN];
    value.extend_from_slice(&from.encode());
    value.extend_from_slice(&to.encode());
    assert_eq!(
        ObjectListFilter::decode(&value),
        Err(AttErrorCode::WriteRequestRejected)
    );

    let filter = ObjectListFilter::ModifiedBetween { from: to, to: from };
    assert_eq!(ObjectListFilter::decode(&filter.encode()), Ok(filter.clone()));
    assert!(filter.uses_last_modified());

    assert_eq!(
        ObjectListFilter::decode(&[FILTER_CURRENT_SIZE_BETWEEN, 9, 0, 0, 0, 1, 0, 0, 0]),
        Err(AttErrorCode::WriteRequestRejected)
    );
    assert_eq!(
        ObjectListFilter::decode(&[FILTER_ALLOCATED_SIZE_BETWEEN, 1, 0, 0, 0]),
        Err(AttErrorCode::InvalidAttributeValueLength)
    );
}

#[test]
fn test_metadata_value_lengths() {
    assert_eq!(
        MetadataValue::decode(MetadataField::Name, b"a.txt"),
        Some(MetadataValue::Name(b"a.txt".to_vec()))
    );
    assert_eq!(MetadataValue::decode(MetadataField::FirstCreated, &[0; 6]), None);
    assert_eq!(MetadataValue::decode(MetadataField::Properties, &[0; 3]), None);
    assert_eq!(
        MetadataValue::decode(MetadataField::Properties, &[0x0C, 0, 0, 0]),
        Some(MetadataValue::Properties(
            ObjectProperties::READ | ObjectProperties::WRITE
        ))
    );
    assert_eq!(
        (MetadataFields::SIZE | MetadataFields::NAME).fields(),
        vec![MetadataField::Name, MetadataField::Size]
    );
}

#[test]
fn test_gatt_handles_lookup() {
    let mut handles = GattHandles::default();
    assert_eq!(handles.get(CharacteristicIndex::Oacp), None);
    handles.set(CharacteristicIndex::Oacp, 0x20);
    assert_eq!(handles.find(0x20), Some(CharacteristicIndex::Oacp));
    assert_eq!(handles.find(0x00), None);
    assert_eq!(
        CharacteristicIndex::from_uuid(OBJECT_CHANGED_UUID),
        Some(CharacteristicIndex::ObjectChanged)
    );
}
