use std::{
    fmt::{self, Display},
    fs::File,
    io::{self, Read},
    os::{fd::AsFd, unix::fs::FileTypeExt},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read from {input}"))]
    ReadInput {
        source: io::Error,
        input: CertSource,
    },

    #[snafu(display("failed to annotate certificates from {input}"))]
    Annotate {
        source: cert_annotator::Error,
        input: CertSource,
    },
}

/// Where a batch of PEM data is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CertSource {
    Stdin,
    File(PathBuf),
}

impl Display for CertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertSource::Stdin => f.write_str("<stdin>"),
            CertSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl CertSource {
    /// Lists the sources to process, in order.
    ///
    /// Piped stdin comes first, followed by the given paths. `-` refers to stdin, which is only
    /// ever read once.
    pub fn collect(stdin_is_pipe: bool, paths: &[PathBuf]) -> Vec<CertSource> {
        let stdin = stdin_is_pipe.then_some(CertSource::Stdin);
        let files = paths.iter().map(|path| {
            if path == Path::new("-") {
                CertSource::Stdin
            } else {
                CertSource::File(path.clone())
            }
        });

        let mut sources = Vec::new();
        for source in stdin.into_iter().chain(files) {
            if source == CertSource::Stdin && sources.contains(&CertSource::Stdin) {
                tracing::debug!("Skipping stdin, it has already been read");
                continue;
            }
            sources.push(source);
        }
        sources
    }

    pub fn read(&self) -> Result<Vec<u8>, Error> {
        let mut contents = Vec::new();
        let read = match self {
            CertSource::Stdin => io::stdin().lock().read_to_end(&mut contents),
            CertSource::File(path) => {
                File::open(path).and_then(|mut file| file.read_to_end(&mut contents))
            }
        };
        read.context(ReadInputSnafu { input: self.clone() })?;
        Ok(contents)
    }

    /// Reads the source and annotates every certificate in it.
    pub fn annotate(&self) -> Result<String, Error> {
        let contents = self.read()?;
        tracing::debug!(input = %self, bytes = contents.len(), "Read certificate source");
        cert_annotator::annotate_source(&contents).context(AnnotateSnafu { input: self.clone() })
    }
}

/// Whether stdin is connected to a named pipe, such as `cat ca.pem | cert-annotate`.
pub fn stdin_is_pipe() -> io::Result<bool> {
    let stdin = File::from(io::stdin().as_fd().try_clone_to_owned()?);
    Ok(stdin.metadata()?.file_type().is_fifo())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SELF_SIGNED_A: &str = include_str!("../../annotator/test-data/self-signed-a.pem");

    fn write_temp_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_collect_sources() {
        let paths = [PathBuf::from("a.pem"), PathBuf::from("b.pem")];
        assert_eq!(
            CertSource::collect(false, &paths),
            vec![
                CertSource::File(PathBuf::from("a.pem")),
                CertSource::File(PathBuf::from("b.pem")),
            ]
        );
        assert_eq!(
            CertSource::collect(true, &paths),
            vec![
                CertSource::Stdin,
                CertSource::File(PathBuf::from("a.pem")),
                CertSource::File(PathBuf::from("b.pem")),
            ]
        );
        assert_eq!(CertSource::collect(false, &[]), vec![]);
    }

    #[test]
    fn test_collect_reads_stdin_once() {
        let paths = [PathBuf::from("-"), PathBuf::from("a.pem"), PathBuf::from("-")];
        assert_eq!(
            CertSource::collect(true, &paths),
            vec![CertSource::Stdin, CertSource::File(PathBuf::from("a.pem"))]
        );
        assert_eq!(
            CertSource::collect(false, &paths),
            vec![CertSource::Stdin, CertSource::File(PathBuf::from("a.pem"))]
        );
    }

    #[test]
    fn test_annotate_file() {
        let file = write_temp_file(SELF_SIGNED_A);
        let source = CertSource::File(file.path().to_owned());

        let annotated = source.annotate().unwrap();
        assert!(annotated.starts_with("\n# Issuer: CN=secret-operator self-signed\n"));
        assert!(annotated.ends_with(SELF_SIGNED_A));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CertSource::File(dir.path().join("missing.pem"));

        assert!(matches!(
            source.annotate(),
            Err(Error::ReadInput { input, .. }) if input == source
        ));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_temp_file("not a certificate\n");
        let source = CertSource::File(file.path().to_owned());

        assert!(matches!(
            source.annotate(),
            Err(Error::Annotate {
                source: cert_annotator::Error::MalformedPem { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(CertSource::Stdin.to_string(), "<stdin>");
        assert_eq!(
            CertSource::File(PathBuf::from("certs/ca.pem")).to_string(),
            "certs/ca.pem"
        );
    }
}
