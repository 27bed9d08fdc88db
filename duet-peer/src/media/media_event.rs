use duet_core::{ConnectivityState, MediaTrack};

/// События, которые медиатранспорт генерирует для координатора.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// От удалённой стороны пришёл трек.
    RemoteTrack(MediaTrack),

    /// Изменилось состояние ICE/DTLS соединения.
    Connectivity(ConnectivityState),
}
