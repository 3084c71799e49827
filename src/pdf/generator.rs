use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

use crate::core::{EcfError, EcfResult};

/// Archivo auxiliar (logo, QR) que el documento referencia por nombre.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Convierte un documento Typst en PDF.
#[async_trait]
pub trait PdfCompiler: Send + Sync {
    async fn compile(&self, source: &str, assets: &[Asset]) -> EcfResult<Vec<u8>>;
}

/// Compila con el binario `typst` en un directorio temporal propio.
pub struct TypstCompiler {
    bin: String,
    work_dir: PathBuf,
}

impl TypstCompiler {
    pub fn new(bin: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        TypstCompiler {
            bin: bin.into(),
            work_dir: work_dir.into(),
        }
    }

    async fn compile_in(&self, dir: &Path, source: &str, assets: &[Asset]) -> EcfResult<Vec<u8>> {
        tokio::fs::create_dir_all(dir).await?;

        for asset in assets {
            let name = Path::new(&asset.name)
                .file_name()
                .ok_or_else(|| EcfError::internal(format!("Nombre de recurso inválido: {}", asset.name)))?;
            tokio::fs::write(dir.join(name), &asset.bytes).await?;
        }

        let main = dir.join("main.typ");
        let output = dir.join("main.pdf");
        tokio::fs::write(&main, source).await?;

        let result = Command::new(&self.bin)
            .arg("compile")
            .arg(&main)
            .arg(&output)
            .output()
            .await
            .map_err(|e| EcfError::internal(format!("Error ejecutando typst: {}", e)))?;

        if !result.status.success() {
            return Err(EcfError::internal(format!(
                "La compilación de Typst falló: {}",
                String::from_utf8_lossy(&result.stderr)
            )));
        }

        Ok(tokio::fs::read(&output).await?)
    }
}

#[async_trait]
impl PdfCompiler for TypstCompiler {
    async fn compile(&self, source: &str, assets: &[Asset]) -> EcfResult<Vec<u8>> {
        if source.trim().is_empty() {
            return Err(EcfError::invalid_argument("El contenido del documento está vacío"));
        }

        let dir = self.work_dir.join(format!("ecf-pdf-{}", Uuid::new_v4()));
        let result = self.compile_in(&dir, source, assets).await;

        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            tracing::debug!("No se pudo limpiar {}: {}", dir.display(), e);
        }

        result
    }
}
