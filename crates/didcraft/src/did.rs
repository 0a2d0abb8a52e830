//! The DID record container: identifier, name, byte length and the field
//! layout, compiled once into a [Plan].

use std::{collections::BTreeMap, fmt};

use crate::{
    errors::{DecodeError, EncodeError, FieldNotFound, LayoutError},
    field::Field,
    options::{DecodeOptions, EncodeOptions},
    plan::Plan,
    value::{DecodedDid, Value},
};

/// A diagnostic identifier with its compiled layout.
///
/// The plan is compiled when the DID is built and whenever its layout changes
/// through [Did::set_length], [Did::with_fields] or [Did::update_fields], so a
/// `Did` never encodes or decodes against a stale plan.
#[derive(Debug, Clone)]
pub struct Did {
    identifier: u32,
    name: String,
    length: usize,
    fields: Vec<Field>,
    /// Service identifiers (e.g. `0x22` ReadDataByIdentifier) that carry
    /// this DID.
    protocol_services: Vec<u8>,
    plan: Plan,
}

impl Did {
    /// Builds a DID of `length` bytes and compiles its plan.
    pub fn new(
        identifier: u32,
        name: impl Into<String>,
        length: usize,
        fields: Vec<Field>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        let plan = compile(&name, &fields, length)?;

        Ok(Did {
            identifier,
            name,
            length,
            fields,
            protocol_services: Vec::new(),
            plan,
        })
    }

    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    pub fn set_identifier(&mut self, identifier: u32) -> &mut Self {
        self.identifier = identifier;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Wire size in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Changes the wire size and recompiles. On error the DID is unchanged.
    pub fn set_length(&mut self, length: usize) -> Result<&mut Self, LayoutError> {
        self.plan = compile(&self.name, &self.fields, length)?;
        self.length = length;
        Ok(self)
    }

    pub fn protocol_services(&self) -> &[u8] {
        &self.protocol_services
    }

    pub fn set_protocol_services(&mut self, protocol_services: Vec<u8>) -> &mut Self {
        self.protocol_services = protocol_services;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn get_field_by_name(&self, name: &str) -> Result<&Field, FieldNotFound> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| FieldNotFound(name.to_string()))
    }

    /// Recompiles the plan from the current fields.
    pub fn refresh(&mut self) -> Result<(), LayoutError> {
        self.plan = compile(&self.name, &self.fields, self.length)?;
        Ok(())
    }

    /// Replaces the layout, returning a new DID with a freshly compiled plan.
    pub fn with_fields(self, fields: Vec<Field>) -> Result<Self, LayoutError> {
        let mut did = Did::new(self.identifier, self.name, self.length, fields)?;
        did.protocol_services = self.protocol_services;
        Ok(did)
    }

    /// Edits a copy of the fields, compiles it, and swaps both in only if the
    /// new layout compiles.
    pub fn update_fields<F>(&mut self, update: F) -> Result<&mut Self, LayoutError>
    where
        F: FnOnce(&mut Vec<Field>),
    {
        let mut fields = self.fields.clone();
        update(&mut fields);

        self.plan = compile(&self.name, &fields, self.length)?;
        self.fields = fields;
        Ok(self)
    }

    /// Encodes `values` into exactly [Did::length] bytes.
    pub fn encode(
        &self,
        values: &BTreeMap<String, Value>,
        options: EncodeOptions,
    ) -> Result<Vec<u8>, EncodeError> {
        self.plan.encode(values, &options)
    }

    /// Decodes `data` into field values. Bytes past the layout are ignored.
    pub fn decode(&self, data: &[u8], options: DecodeOptions) -> Result<DecodedDid, DecodeError> {
        self.plan.decode(data, &options)
    }
}

fn compile(name: &str, fields: &[Field], length: usize) -> Result<Plan, LayoutError> {
    let plan = Plan::compile(fields, length)?;
    tracing::debug!(did = name, fields = fields.len(), length, "compiled DID plan");
    Ok(plan)
}

impl PartialEq for Did {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.name == other.name
            && self.length == other.length
            && self.fields == other.fields
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did('{}', 0x{:04x})", self.name, self.identifier)
    }
}

#[cfg(feature = "serde")]
impl TryFrom<crate::serde::DidDef> for Did {
    type Error = LayoutError;

    fn try_from(value: crate::serde::DidDef) -> Result<Self, Self::Error> {
        let (fields, bits) = crate::serde::layout_fields(value.fields)?;
        let length = value.length.unwrap_or(bits.div_ceil(8));
        let mut did = Did::new(value.identifier, value.name, length, fields)?;
        did.protocol_services = value.protocol_services;
        Ok(did)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::{
        field::{ByteOrder, Choices, Encoding, Quantity},
        value::DecodedValue,
    };

    fn foo() -> Did {
        Did::new(
            0x0001,
            "Foo",
            2,
            vec![Field::new("Bar", 0, 8), Field::new("Fum", 8, 8)],
        )
        .unwrap()
    }

    fn values<const N: usize>(pairs: [(&str, Value); N]) -> BTreeMap<String, Value> {
        pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn test_encode_decode() {
        let did = foo();
        let encoded = did
            .encode(
                &values([("Bar", Value::Unsigned(1)), ("Fum", Value::Unsigned(69))]),
                EncodeOptions::default(),
            )
            .unwrap();
        assert_eq!(encoded, vec![0x01, 0x45]);

        let decoded = did.decode(&[0x01, 0x45], DecodeOptions::default()).unwrap();
        assert_eq!(decoded["Bar"], DecodedValue::Scalar(Value::Unsigned(1)));
        assert_eq!(decoded["Fum"], DecodedValue::Scalar(Value::Unsigned(69)));
    }

    #[test]
    fn test_big_endian_word() {
        let mut word = Field::new("Word", 0, 16);
        word.set_byte_order(ByteOrder::BigEndian);
        let did = Did::new(0xF190, "Word", 2, vec![word]).unwrap();

        let encoded = did
            .encode(&values([("Word", Value::Unsigned(0x1234))]), EncodeOptions::default())
            .unwrap();
        assert_eq!(encoded, vec![0x12, 0x34]);
    }

    #[test]
    fn test_choice_round_trip() {
        let mut switch = Field::new("Switch", 0, 8);
        switch.set_choices(Choices::from([(0, "OFF".to_string()), (1, "ON".to_string())]));
        let did = Did::new(0x0100, "Lamp", 1, vec![switch]).unwrap();

        let encoded = did
            .encode(&values([("Switch", Value::from("ON"))]), EncodeOptions::default())
            .unwrap();

        let decoded = did.decode(&encoded, DecodeOptions::default()).unwrap();
        assert_eq!(
            decoded["Switch"],
            DecodedValue::Scalar(Value::Choice("ON".to_string()))
        );

        let mut options = DecodeOptions::default();
        options.set_decode_choices(false);
        let decoded = did.decode(&encoded, options).unwrap();
        assert_eq!(decoded["Switch"], DecodedValue::Scalar(Value::Unsigned(1)));
    }

    #[test]
    fn test_get_field_by_name() {
        let did = foo();
        assert_eq!(did.get_field_by_name("Fum").unwrap().start, 8);
        assert_eq!(
            did.get_field_by_name("Missing"),
            Err(FieldNotFound("Missing".to_string()))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(foo().to_string(), "did('Foo', 0x0001)");

        let mut did = foo();
        did.set_identifier(0xF190).set_name("Vin");
        assert_eq!(did.to_string(), "did('Vin', 0xf190)");
    }

    #[test]
    fn test_equality_ignores_plan() {
        let mut did = foo();
        did.refresh().unwrap();
        assert_eq!(did, foo());

        did.set_name("Other");
        assert_ne!(did, foo());
    }

    #[test]
    fn test_update_fields_recompiles() {
        let mut did = foo();
        did.update_fields(|fields| fields.push(Field::new("Extra", 16, 8)))
            .unwrap()
            .set_length(3)
            .unwrap();

        let decoded = did.decode(&[1, 2, 3], DecodeOptions::default()).unwrap();
        assert_eq!(decoded["Extra"], DecodedValue::Scalar(Value::Unsigned(3)));
        assert_eq!(did.plan().total_bytes(), 3);
    }

    #[test]
    fn test_update_fields_keeps_layout_on_error() {
        let mut did = foo();
        let result = did.update_fields(|fields| fields.push(Field::new("Bar", 16, 8)));
        assert_eq!(
            result.unwrap_err(),
            LayoutError::InvalidFieldName("Bar".to_string())
        );
        assert_eq!(did, foo());
        assert!(did.decode(&[1, 2], DecodeOptions::default()).is_ok());
    }

    #[test]
    fn test_oversized_byte_field() {
        let mut vin = Field::new("Vin", 0, 8);
        vin.set_encoding(Encoding::Ascii)
            .set_quantity(Quantity::Field)
            .set_maximum(1e19);

        assert_eq!(
            Did::new(0xF190, "Vin", 17, vec![vin]).unwrap_err(),
            LayoutError::InvalidFieldSize {
                field: "Vin".to_string(),
                bits: usize::MAX
            }
        );
    }

    #[test]
    fn test_protocol_services() {
        let mut did = foo();
        assert!(did.protocol_services().is_empty());

        did.set_protocol_services(vec![0x22, 0x2E]);
        assert_eq!(did.protocol_services(), &[0x22, 0x2E]);

        let did = did.with_fields(vec![Field::new("Word", 0, 16)]).unwrap();
        assert_eq!(did.protocol_services(), &[0x22, 0x2E]);
    }

    #[test]
    fn test_with_fields() {
        let did = foo()
            .with_fields(vec![Field::new("Word", 0, 16)])
            .unwrap();
        assert_eq!(did.identifier(), 0x0001);
        assert_eq!(did.fields().len(), 1);

        let decoded = did.decode(&[0x34, 0x12], DecodeOptions::default()).unwrap();
        assert_eq!(decoded["Word"], DecodedValue::Scalar(Value::Unsigned(0x1234)));
    }

    #[test]
    fn test_concurrent_decode() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Did>();

        let did = Arc::new(foo());
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let did = Arc::clone(&did);
                thread::spawn(move || did.decode(&[i, 69], DecodeOptions::default()))
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let decoded = handle.join().unwrap().unwrap();
            assert_eq!(decoded["Bar"], DecodedValue::Scalar(Value::Unsigned(i as u64)));
        }
    }
}
