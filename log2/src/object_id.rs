/// Identifies the object a report is about. Composite ids are joined with `/`.
#[derive(Clone, Debug)]
pub struct ObjectId<'a>(std::borrow::Cow<'a, str>);

impl std::ops::Deref for ObjectId<'_> {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl std::fmt::Display for ObjectId<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl<'a> From<&'a str> for ObjectId<'a> {
	fn from(s: &'a str) -> Self {
		ObjectId(s.into())
	}
}

impl<'a> From<&'a String> for ObjectId<'a> {
	fn from(s: &'a String) -> Self {
		ObjectId(s.as_str().into())
	}
}

impl From<String> for ObjectId<'_> {
	fn from(s: String) -> Self {
		ObjectId(s.into())
	}
}

impl<T1, T2> From<(&'_ T1, &'_ T2)> for ObjectId<'_>
where
	T1: AsRef<str> + ?Sized,
	T2: AsRef<str> + ?Sized,
{
	fn from((s1, s2): (&'_ T1, &'_ T2)) -> Self {
		ObjectId(format!("{}/{}", s1.as_ref(), s2.as_ref()).into())
	}
}

impl<T1, T2, T3> From<(&'_ T1, &'_ T2, &'_ T3)> for ObjectId<'_>
where
	T1: AsRef<str> + ?Sized,
	T2: AsRef<str> + ?Sized,
	T3: AsRef<str> + ?Sized,
{
	fn from((s1, s2, s3): (&'_ T1, &'_ T2, &'_ T3)) -> Self {
		ObjectId(format!("{}/{}/{}", s1.as_ref(), s2.as_ref(), s3.as_ref()).into())
	}
}

impl serde::Serialize for ObjectId<'_> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde::Serializer {
		serializer.serialize_str(&self.0)
	}
}
