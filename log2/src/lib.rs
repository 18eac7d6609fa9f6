mod object_id;
pub use object_id::ObjectId;

/// Reports the progress of one renewal invocation.
///
/// Every report is forwarded to the `log` facade and also appended to an in-memory buffer of JSON records,
/// which a log sink can drain with [`Logger::take_records`].
pub struct Logger {
	inner: std::sync::Mutex<LoggerInner>,
}

struct LoggerInner {
	invocation_id: Option<String>,
	sequence_number: usize,
	records: Vec<u8>,
}

impl Logger {
	pub fn new(invocation_id: Option<String>) -> Self {
		Logger {
			inner: std::sync::Mutex::new(LoggerInner {
				invocation_id,
				sequence_number: 0,
				records: vec![],
			}),
		}
	}

	pub fn report_error(&self, err: &anyhow::Error) {
		self.report_inner(Report::Error { err, level: log::Level::Error });
	}

	pub fn report_warning(&self, err: &anyhow::Error) {
		self.report_inner(Report::Error { err, level: log::Level::Warn });
	}

	pub fn report_message(&self, message: std::fmt::Arguments<'_>) {
		let message = message.to_string();
		self.report_inner(Report::Message { message: &message });
	}

	pub async fn report_operation<'a, F>(
		&self,
		object_type: &str,
		object_id: impl Into<ObjectId<'a>>,
		operation: ScopedObjectOperation<'_>,
		f: F,
	) -> F::Output
	where
		F: std::future::Future,
		F::Output: std::fmt::Debug,
	{
		let object_id = object_id.into();
		let id = &*object_id;

		let (start, end) = match operation {
			ScopedObjectOperation::Create { value } => (ObjectOperation::CreateStart { value }, Some(ObjectOperation::CreateEnd)),
			ScopedObjectOperation::Update { value } => (ObjectOperation::UpdateStart { value }, Some(ObjectOperation::UpdateEnd)),
			ScopedObjectOperation::Delete => (ObjectOperation::DeleteStart, Some(ObjectOperation::DeleteEnd)),
			ScopedObjectOperation::Get => (ObjectOperation::GetStart, None),
		};

		self.report_inner(Report::ObjectOperation { r#type: object_type, id, operation: start });
		let result = f.await;
		if let Some(end) = end {
			self.report_inner(Report::ObjectOperation { r#type: object_type, id, operation: end });
		}
		else {
			let value = format!("{result:?}");
			self.report_inner(Report::ObjectOperation { r#type: object_type, id, operation: ObjectOperation::GetEnd { value: &value } });
		}
		result
	}

	pub fn report_state<'a>(&self, object_type: &str, object_id: impl Into<ObjectId<'a>>, state: impl std::fmt::Display) {
		let object_id = object_id.into();
		let state = state.to_string();
		self.report_inner(Report::ObjectState { r#type: object_type, id: &*object_id, state: &state });
	}

	/// Drains the JSON records buffered so far, as a comma-separated sequence of objects.
	pub fn take_records(&self) -> Vec<u8> {
		let mut inner = self.inner.lock().expect("logger mutex poisoned");
		std::mem::take(&mut inner.records)
	}

	fn report_inner(&self, report: Report<'_>) {
		let timestamp = time::OffsetDateTime::now_utc();

		{
			let mut inner = self.inner.lock().expect("logger mutex poisoned");
			let LoggerInner { invocation_id, sequence_number, records } = &mut *inner;

			*sequence_number += 1;
			if !records.is_empty() {
				records.push(b',');
			}

			let record = serde_json::to_vec(&Record {
				timestamp,
				sequence_number: *sequence_number,
				invocation_id: invocation_id.as_deref(),
				report,
			}).expect("could not serialize log record");
			records.extend_from_slice(&record);
		}

		log::log!(report.level(), "{report:?}");
	}
}

#[derive(Clone, Copy, Debug)]
pub enum ScopedObjectOperation<'a> {
	Create { value: &'a str },
	Update { value: &'a str },
	Delete,
	Get,
}

/// Hides a value from the `Debug` output that `report_operation` records.
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Secret<T>(pub T);

impl<T> std::fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("******")
	}
}

struct Record<'a> {
	timestamp: time::OffsetDateTime,
	sequence_number: usize,
	invocation_id: Option<&'a str>,
	report: Report<'a>,
}

#[derive(Clone, Copy, Debug)]
enum Report<'a> {
	Error {
		err: &'a anyhow::Error,
		level: log::Level,
	},

	Message {
		message: &'a str,
	},

	ObjectOperation {
		r#type: &'a str,
		id: &'a str,
		operation: ObjectOperation<'a>,
	},

	ObjectState {
		r#type: &'a str,
		id: &'a str,
		state: &'a str,
	},
}

impl Report<'_> {
	fn level(self) -> log::Level {
		match self {
			Report::Error { level, .. } => level,
			Report::Message { .. } |
			Report::ObjectOperation { .. } |
			Report::ObjectState { .. } => log::Level::Info,
		}
	}
}

#[derive(Clone, Copy, Debug)]
enum ObjectOperation<'a> {
	CreateStart { value: &'a str },
	CreateEnd,

	UpdateStart { value: &'a str },
	UpdateEnd,

	DeleteStart,
	DeleteEnd,

	GetStart,
	GetEnd { value: &'a str },
}

impl serde::Serialize for Record<'_> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
		use serde::ser::SerializeStruct;

		let Record {
			timestamp,
			sequence_number,
			invocation_id,
			report,
		} = self;

		let mut serializer = serializer.serialize_struct("Record", 1)?;

		serializer.serialize_field("TimeCollected", &SerializeWith(*timestamp))?;
		if let Some(invocation_id) = invocation_id {
			serializer.serialize_field("InvocationId", invocation_id)?;
		}
		serializer.serialize_field("SequenceNumber", sequence_number)?;
		serializer.serialize_field("Level", &SerializeWith(report.level()))?;

		match report {
			Report::Error { err, level: _ } => {
				serializer.serialize_field("Exception", &format!("{err:?}"))?;
			},

			Report::Message { message } => {
				serializer.serialize_field("Message", message)?;
			},

			Report::ObjectOperation { r#type, id, operation } => {
				serializer.serialize_field("ObjectType", r#type)?;
				serializer.serialize_field("ObjectId", id)?;
				match operation {
					ObjectOperation::CreateStart { value } => {
						serializer.serialize_field("ObjectOperation", "CreateStart")?;
						serializer.serialize_field("ObjectValue", value)?;
					},

					ObjectOperation::CreateEnd => {
						serializer.serialize_field("ObjectOperation", "CreateEnd")?;
					},

					ObjectOperation::UpdateStart { value } => {
						serializer.serialize_field("ObjectOperation", "UpdateStart")?;
						serializer.serialize_field("ObjectValue", value)?;
					},

					ObjectOperation::UpdateEnd => {
						serializer.serialize_field("ObjectOperation", "UpdateEnd")?;
					},

					ObjectOperation::DeleteStart => {
						serializer.serialize_field("ObjectOperation", "DeleteStart")?;
					},

					ObjectOperation::DeleteEnd => {
						serializer.serialize_field("ObjectOperation", "DeleteEnd")?;
					},

					ObjectOperation::GetStart => {
						serializer.serialize_field("ObjectOperation", "GetStart")?;
					},

					ObjectOperation::GetEnd { value } => {
						serializer.serialize_field("ObjectOperation", "GetEnd")?;
						serializer.serialize_field("ObjectValue", value)?;
					},
				}
			},

			Report::ObjectState { r#type, id, state } => {
				serializer.serialize_field("ObjectType", r#type)?;
				serializer.serialize_field("ObjectId", id)?;
				serializer.serialize_field("ObjectState", state)?;
			},
		}

		serializer.end()
	}
}

struct SerializeWith<T>(T);

impl std::fmt::Display for SerializeWith<time::OffsetDateTime> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let timestamp = self.0.replace_nanosecond(u32::from(self.0.millisecond()) * 1_000_000).map_err(|_| std::fmt::Error)?;
		let timestamp = timestamp.format(&time::format_description::well_known::Rfc3339).map_err(|_| std::fmt::Error)?;
		f.write_str(&timestamp)
	}
}

impl serde::Serialize for SerializeWith<time::OffsetDateTime> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
		serializer.collect_str(self)
	}
}

impl serde::Serialize for SerializeWith<log::Level> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
		match self.0 {
			log::Level::Debug => serializer.serialize_str("Debug"),
			log::Level::Error => serializer.serialize_str("Error"),
			log::Level::Info => serializer.serialize_str("Information"),
			log::Level::Trace => serializer.serialize_str("Trace"),
			log::Level::Warn => serializer.serialize_str("Warning"),
		}
	}
}
