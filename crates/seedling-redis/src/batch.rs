//! Write batches issued to the key-value store.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use seedling_fixtures::kv::{DatabaseId, KvDatabase};

/// A single command of a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCommand {
	/// `SELECT <db>`
	Select(DatabaseId),
	/// `FLUSHDB`
	FlushDb,
	/// `SET <key> <value> [EX|PX <ttl>]`
	Set {
		/// Key.
		key: String,
		/// Value.
		value: String,
		/// Optional time to live.
		expiration: Option<Duration>,
	},
	/// `HSET <key> <field> <value>`
	HSet {
		/// Hash key.
		key: String,
		/// Field name.
		field: String,
		/// Field value.
		value: String,
	},
	/// `SADD <key> <member>`
	SAdd {
		/// Set key.
		key: String,
		/// Member.
		member: String,
	},
	/// `EXPIRE <key> <ttl>` (or `PEXPIRE` for sub-second durations)
	Expire {
		/// Key.
		key: String,
		/// Time to live.
		ttl: Duration,
	},
}

impl KvCommand {
	/// Command name followed by its arguments, as sent on the wire.
	pub fn args(&self) -> Vec<String> {
		match self {
			Self::Select(db) => vec!["SELECT".to_string(), db.to_string()],
			Self::FlushDb => vec!["FLUSHDB".to_string()],
			Self::Set {
				key,
				value,
				expiration,
			} => {
				let mut args = vec!["SET".to_string(), key.clone(), value.clone()];
				if let Some(ttl) = expiration {
					let (unit, amount) = if ttl.subsec_nanos() == 0 {
						("EX", ttl.as_secs().to_string())
					} else {
						("PX", whole_millis(*ttl).to_string())
					};
					args.push(unit.to_string());
					args.push(amount);
				}
				args
			}
			Self::HSet { key, field, value } => {
				vec!["HSET".to_string(), key.clone(), field.clone(), value.clone()]
			}
			Self::SAdd { key, member } => vec!["SADD".to_string(), key.clone(), member.clone()],
			Self::Expire { key, ttl } => {
				if ttl.subsec_nanos() == 0 {
					vec!["EXPIRE".to_string(), key.clone(), ttl.as_secs().to_string()]
				} else {
					vec!["PEXPIRE".to_string(), key.clone(), whole_millis(*ttl).to_string()]
				}
			}
		}
	}
}

/// Milliseconds of `ttl`, rounded up so a non-zero ttl never renders as `0`.
fn whole_millis(ttl: Duration) -> u128 {
	ttl.as_nanos().div_ceil(1_000_000)
}

impl fmt::Display for KvCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.args().join(" "))
	}
}

/// Commands applied atomically to one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
	database: DatabaseId,
	commands: Vec<KvCommand>,
	records: usize,
}

impl WriteBatch {
	/// Builds the batch writing `data` into `database`.
	///
	/// The batch selects the database, flushes it when `flush` is set, then
	/// writes keys, hash fields and set members in document order. Set
	/// members can carry their own expiration but redis expires whole keys,
	/// so each set key gets the shortest expiration among its members.
	pub fn for_database(database: DatabaseId, data: &KvDatabase, flush: bool) -> Self {
		let mut commands = vec![KvCommand::Select(database)];
		if flush {
			commands.push(KvCommand::FlushDb);
		}

		if let Some(keys) = &data.keys {
			for (key, entry) in &keys.values {
				commands.push(KvCommand::Set {
					key: key.clone(),
					value: entry.value.clone(),
					expiration: entry.expiration,
				});
			}
		}

		for (key, map) in &data.maps {
			for (field, value) in &map.values {
				commands.push(KvCommand::HSet {
					key: key.clone(),
					field: field.clone(),
					value: value.clone(),
				});
			}
		}

		let mut set_expirations: IndexMap<&str, Duration> = IndexMap::new();
		for (key, set) in &data.sets {
			for (member, options) in &set.values {
				commands.push(KvCommand::SAdd {
					key: key.clone(),
					member: member.clone(),
				});
				if let Some(ttl) = options.expiration {
					set_expirations
						.entry(key.as_str())
						.and_modify(|shortest| *shortest = (*shortest).min(ttl))
						.or_insert(ttl);
				}
			}
		}
		for (key, ttl) in set_expirations {
			commands.push(KvCommand::Expire {
				key: key.to_string(),
				ttl,
			});
		}

		Self {
			database,
			commands,
			records: data.record_count(),
		}
	}

	/// Target database.
	pub fn database(&self) -> DatabaseId {
		self.database
	}

	/// Commands in issue order.
	pub fn commands(&self) -> &[KvCommand] {
		&self.commands
	}

	/// Returns true if the batch flushes its database.
	pub fn flushes(&self) -> bool {
		self.commands.contains(&KvCommand::FlushDb)
	}

	/// Keys, fields and members written by the batch.
	pub fn record_count(&self) -> usize {
		self.records
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use seedling_fixtures::kv::{KeyValue, ResolvedRecord, SetMember};

	fn record<V>(values: Vec<(&str, V)>) -> ResolvedRecord<V> {
		ResolvedRecord {
			name: None,
			extends: None,
			values: values
				.into_iter()
				.map(|(k, v)| (k.to_string(), v))
				.collect(),
		}
	}

	fn member(ttl: Option<u64>) -> SetMember {
		SetMember {
			expiration: ttl.map(Duration::from_secs),
		}
	}

	#[rstest]
	fn test_batch_order() {
		let mut data = KvDatabase::default();
		data.keys = Some(record(vec![
			("key1", KeyValue::new("value1")),
			(
				"key2",
				KeyValue::new("value2").with_expiration(Duration::from_secs(10)),
			),
		]));
		data.maps
			.insert("map1".to_string(), record(vec![("a", "1".to_string())]));
		data.sets.insert(
			"set1".to_string(),
			record(vec![("a", member(Some(30))), ("b", member(Some(10))), ("c", member(None))]),
		);

		let batch = WriteBatch::for_database(1, &data, true);
		let rendered: Vec<String> = batch.commands().iter().map(ToString::to_string).collect();
		assert_eq!(
			rendered,
			vec![
				"SELECT 1",
				"FLUSHDB",
				"SET key1 value1",
				"SET key2 value2 EX 10",
				"HSET map1 a 1",
				"SADD set1 a",
				"SADD set1 b",
				"SADD set1 c",
				"EXPIRE set1 10",
			]
		);
		assert_eq!(batch.record_count(), 6);
		assert!(batch.flushes());
	}

	#[rstest]
	fn test_batch_without_flush() {
		let batch = WriteBatch::for_database(3, &KvDatabase::default(), false);
		assert_eq!(batch.commands(), &[KvCommand::Select(3)]);
		assert!(!batch.flushes());
		assert_eq!(batch.database(), 3);
	}

	#[rstest]
	#[case(Duration::from_secs(5), "SET k v EX 5")]
	#[case(Duration::from_millis(1500), "SET k v PX 1500")]
	#[case(Duration::from_micros(500), "SET k v PX 1")]
	#[case(Duration::from_nanos(1_000_001), "SET k v PX 2")]
	fn test_set_expiration_units(#[case] ttl: Duration, #[case] expected: &str) {
		let command = KvCommand::Set {
			key: "k".to_string(),
			value: "v".to_string(),
			expiration: Some(ttl),
		};
		assert_eq!(command.to_string(), expected);
	}

	#[rstest]
	fn test_sub_second_expire() {
		let command = KvCommand::Expire {
			key: "s".to_string(),
			ttl: Duration::from_millis(250),
		};
		assert_eq!(command.args(), vec!["PEXPIRE", "s", "250"]);
	}

	#[rstest]
	#[case(Duration::from_micros(500), "1")]
	#[case(Duration::from_nanos(1), "1")]
	#[case(Duration::from_micros(1500), "2")]
	fn test_sub_millisecond_expire_rounds_up(#[case] ttl: Duration, #[case] millis: &str) {
		let command = KvCommand::Expire {
			key: "s".to_string(),
			ttl,
		};
		assert_eq!(command.args(), vec!["PEXPIRE", "s", millis]);
	}
}
