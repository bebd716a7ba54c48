//! Shared fixtures: a throwaway CA with server and client certificates on disk.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct TestPki {
    dir: TempDir,
    pub ca_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub client_cert_path: PathBuf,
    pub client_key_path: PathBuf,
}

impl TestPki {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// CA, a `localhost` server certificate and a client certificate, all PEM.
pub fn generate_pki() -> TestPki {
    let ca_key = rcgen::KeyPair::generate().unwrap();
    let mut ca_params = rcgen::CertificateParams::new(vec!["Test CA".to_string()]).unwrap();
    ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let server_key = rcgen::KeyPair::generate().unwrap();
    let server_params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key).unwrap();

    let client_key = rcgen::KeyPair::generate().unwrap();
    let client_params = rcgen::CertificateParams::new(vec!["client.test".to_string()]).unwrap();
    let client_cert = client_params.signed_by(&client_key, &ca_cert, &ca_key).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let write = |name: &str, contents: String| {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    };

    TestPki {
        ca_path: write("ca.pem", ca_cert.pem()),
        cert_path: write("server.pem", server_cert.pem()),
        key_path: write("server.key", server_key.serialize_pem()),
        client_cert_path: write("client.pem", client_cert.pem()),
        client_key_path: write("client.key", client_key.serialize_pem()),
        dir,
    }
}
