use crate::core::{EcfError, EcfResult};

/// Frontera de error para piezas de un documento: si construir la pieza
/// falla, se usa su reemplazo y el resto del documento sigue adelante.
pub trait Boundary {
    type Output;

    /// Nombre de la pieza, para el log.
    fn name(&self) -> &str;

    fn fallback(&self, error: &EcfError) -> Self::Output;

    fn render<F>(&self, children: F) -> Self::Output
    where
        F: FnOnce() -> EcfResult<Self::Output>,
    {
        match children() {
            Ok(output) => output,
            Err(error) => {
                tracing::warn!("{} no disponible, usando reemplazo: {}", self.name(), error);
                self.fallback(&error)
            }
        }
    }
}
