#![cfg(feature="serde")]
use super::bucket::Bucket;
use super::{Histogram, Statistics, MAX_BUCKETS};

use std::fmt;

use serde::{de, de::{Deserializer, MapAccess, Visitor}, ser::{Error as _, Serialize, SerializeStruct, SerializeTuple, Serializer}, Deserialize};

impl Serialize for Bucket {
    /// A bucket is written as the triple `[min, span, count]`.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let mut triple = serializer.serialize_tuple(3)?;
        triple.serialize_element(&self.min)?;
        triple.serialize_element(&self.span)?;
        triple.serialize_element(&self.count)?;
        triple.end()
    }
}

impl<'de> Deserialize<'de> for Bucket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let (min, span, count) = <(u64, u64, u32)>::deserialize(deserializer)?;
        Bucket::from_parts(min, span, count).map_err(de::Error::custom)
    }
}

impl Serialize for Histogram {
    /// The histogram is compacted and written as its bucket capacity and a
    /// sequence of buckets.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let buckets = self.compacted().map_err(S::Error::custom)?;
        let mut record = serializer.serialize_struct("Histogram", 2)?;
        record.serialize_field("max_buckets", &self.max_buckets)?;
        record.serialize_field("buckets", &*buckets)?;
        record.end()
    }
}

const HISTOGRAM_FIELDS: &[&str] = &["max_buckets", "buckets"];

struct HistogramVisitor;

impl<'de> Visitor<'de> for HistogramVisitor {
    type Value = Histogram;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a histogram with a sequence of [min, span, count] buckets")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where M: MapAccess<'de> {
        let mut max_buckets = None;
        let mut buckets = None;
        while let Some(key) = access.next_key::<String>()? {
            match key.as_str() {
                "max_buckets" => max_buckets = Some(access.next_value::<usize>()?),
                "buckets" => buckets = Some(access.next_value::<Vec<Bucket>>()?),
                other => return Err(de::Error::unknown_field(other, HISTOGRAM_FIELDS)),
            }
        }
        let buckets = buckets.ok_or_else(|| de::Error::missing_field("buckets"))?;
        // older encodings carried no capacity
        let max_buckets = max_buckets.unwrap_or(MAX_BUCKETS);
        Histogram::from_buckets(max_buckets, buckets).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Histogram {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        deserializer.deserialize_struct("Histogram", HISTOGRAM_FIELDS, HistogramVisitor)
    }
}

impl Serialize for Statistics {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        let mut record = serializer.serialize_struct("Statistics", 9)?;
        record.serialize_field("min", &self.min)?;
        record.serialize_field("max", &self.max)?;
        record.serialize_field("count", &self.count)?;
        record.serialize_field("low_outliers", &self.low_outliers)?;
        record.serialize_field("high_outliers", &self.high_outliers)?;
        record.serialize_field("trimedian", &self.trimedian)?;
        record.serialize_field("std_dev", &self.std_dev)?;
        record.serialize_field("snr", &self.snr)?;
        record.serialize_field("sparkline", &self.sparkline)?;
        record.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    type Error = super::super::Error;

    #[test]
    fn histogram_serde_json() -> Result<(), Error> {
        let mut h1 = Histogram::new();
        for v in 0..2000u64 {
            h1.add_observation(v * 101 % 1999)?;
        }
        let json_data = json!(h1).to_string();
        let h2: Histogram = match serde_json::from_str(json_data.as_str()) {
            Ok(h) => h,
            Err(e) => return Err(Error::CorruptEncoding(e.to_string())),
        };
        assert_eq!(h2.count(), h1.count());
        assert_eq!(h2.statistics()?, h1.statistics()?);
        Ok(())
    }

    #[test]
    fn bucket_layout() -> Result<(), Error> {
        let h = hist![3, 1, 2];
        let encoded = serde_json::to_string(&h).map_err(|e| Error::CorruptEncoding(e.to_string()))?;
        assert_eq!(encoded, r#"{"max_buckets":256,"buckets":[[1,0,1],[2,0,1],[3,0,1]]}"#);
        let h: Histogram = serde_json::from_str(r#"{"buckets":[[10,10,3],[50,0,2]]}"#)
            .map_err(|e| Error::CorruptEncoding(e.to_string()))?;
        assert_eq!(h.max_buckets, MAX_BUCKETS);
        assert_eq!(h.count(), 5);
        assert_eq!(h.by_rank(2)?, 15);
        assert_eq!(h.max()?, 50);
        Ok(())
    }

    #[test]
    fn keeps_capacity() -> Result<(), Error> {
        let mut h1 = Histogram::with_max_buckets(16)?;
        for v in 0..500u64 {
            h1.add_observation(v * 7 % 499)?;
        }
        let h2: Histogram = serde_json::from_str(&json!(h1).to_string())
            .map_err(|e| Error::CorruptEncoding(e.to_string()))?;
        assert_eq!(h2.max_buckets, 16);
        assert!(h2.buckets.borrow().len() < 16);
        assert_eq!(h2.statistics()?, h1.statistics()?);
        Ok(())
    }

    #[test]
    fn rejects_empty_bucket() {
        assert!(serde_json::from_str::<Histogram>(r#"{"buckets":[[10,0,0]]}"#).is_err());
        assert!(serde_json::from_str::<Histogram>(r#"{"buckets":[[18446744073709551615,1,1]]}"#).is_err());
        assert!(serde_json::from_str::<Histogram>(r#"{"max_buckets":1,"buckets":[]}"#).is_err());
        assert!(serde_json::from_str::<Histogram>(r#"{"max_buckets":16}"#).is_err());
    }

    #[test]
    fn statistics_record() -> Result<(), Error> {
        let stats = hist![5].statistics()?;
        assert_eq!(
            json!(stats),
            json!({
                "min": 5, "max": 5, "count": 1,
                "low_outliers": 0, "high_outliers": 0,
                "trimedian": 5, "std_dev": 0.0, "snr": 14,
                "sparkline": "█▁▁▁▁▁▁▁▁",
            })
        );
        Ok(())
    }
}
