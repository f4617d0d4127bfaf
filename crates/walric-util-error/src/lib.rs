use std::{error, fmt};

pub type BoxedError = Box<dyn error::Error + Send + Sync + 'static>;
pub type BoxedErrorResult<T> = std::result::Result<T, BoxedError>;

/// Walks an error and all its `source()`s, outermost first
pub fn error_chain<'e>(
    err: &'e (dyn error::Error + 'static),
) -> impl Iterator<Item = &'e (dyn error::Error + 'static)> {
    std::iter::successors(Some(err), |err| err.source())
}

/// Formats an error with its whole chain on a single line, joined with `: `
///
/// Meant for log fields, where multi-line reports are unwelcome.
pub struct FmtCompactError<'e>(&'e (dyn error::Error + 'static));

impl fmt::Display for FmtCompactError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in error_chain(self.0).enumerate() {
            if 0 < i {
                f.write_str(": ")?;
            }
            fmt::Display::fmt(err, f)?;
        }
        Ok(())
    }
}

pub trait FmtCompact {
    fn fmt_compact(&self) -> FmtCompactError<'_>;
}

impl<E> FmtCompact for E
where
    E: error::Error + 'static,
{
    fn fmt_compact(&self) -> FmtCompactError<'_> {
        FmtCompactError(self)
    }
}

impl FmtCompact for dyn error::Error + Send + Sync + 'static {
    fn fmt_compact(&self) -> FmtCompactError<'_> {
        FmtCompactError(self)
    }
}

/// Erase the concrete error type, e.g. to cross a trait boundary
pub trait BoxedErrorExt<T> {
    fn boxed(self) -> BoxedErrorResult<T>;
}

impl<T, E> BoxedErrorExt<T> for std::result::Result<T, E>
where
    E: error::Error + Send + Sync + 'static,
{
    fn boxed(self) -> BoxedErrorResult<T> {
        self.map_err(|err| Box::new(err) as BoxedError)
    }
}

#[cfg(test)]
mod tests {
    use snafu::{ResultExt as _, Snafu};

    use super::*;

    #[derive(Debug, Snafu)]
    enum Inner {
        #[snafu(display("disk on fire"))]
        Disk,
    }

    #[derive(Debug, Snafu)]
    enum Outer {
        #[snafu(display("saving failed"))]
        Save { source: Inner },
    }

    fn save() -> Result<(), Outer> {
        Err(Inner::Disk).context(SaveSnafu)
    }

    #[test]
    fn compact_joins_the_whole_chain() {
        let err = save().unwrap_err();
        assert_eq!(err.fmt_compact().to_string(), "saving failed: disk on fire");
    }

    #[test]
    fn compact_without_source_is_plain_display() {
        assert_eq!(Inner::Disk.fmt_compact().to_string(), "disk on fire");
    }

    #[test]
    fn boxed_keeps_the_message() {
        let res: Result<(), Inner> = Err(Inner::Disk);
        assert_eq!(BoxedErrorExt::boxed(res).unwrap_err().to_string(), "disk on fire");
    }
}
