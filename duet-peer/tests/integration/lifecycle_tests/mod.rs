mod test_description_unavailable;
mod test_leave_is_idempotent;
mod test_media_access_denied;
mod test_negotiation_timeout;
mod test_peer_rejoin;
