use super::state::{Effect, NegotiationInput, NegotiationState, Step};
use crate::error::NegotiationError;
use crate::model::{MemberId, SdpType, SessionRole, SignalingMessage};

use NegotiationInput as In;
use NegotiationState as St;

/// Чистая функция переходов offer/answer для одного участника.
///
/// Ничего не исполняет сама: возвращает следующее состояние и список эффектов,
/// которые координатор выполняет до фиксации нового состояния.
#[derive(Debug, Clone)]
pub struct Negotiation {
    role: SessionRole,
    local: MemberId,
}

impl Negotiation {
    pub fn new(role: SessionRole, local: MemberId) -> Self {
        Self { role, local }
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn local(&self) -> &MemberId {
        &self.local
    }

    pub fn step(
        &self,
        state: NegotiationState,
        input: &NegotiationInput,
    ) -> Result<Step, NegotiationError> {
        let stale = || NegotiationError::StaleEvent {
            state,
            input: input.name(),
        };

        // Own publications echoed back by the relay.
        match input {
            In::OfferReceived(p) if p.sender_id == self.local => return Ok(Step::Ignore),
            In::AnswerReceived(p) if p.sender_id == self.local => return Ok(Step::Ignore),
            _ => {}
        }

        let step = match (state, input) {
            (St::Closed, In::Teardown) => Step::advance(St::Closed, Vec::<Effect>::new()),
            (_, In::Teardown) => Step::advance(St::Closed, [Effect::Close]),
            (St::Closed, _) => return Err(stale()),

            (St::Idle, In::LocalJoined) => Step::advance(St::ConnectionOpen, [Effect::OpenConnection]),
            (St::Idle, In::PeerJoined) => Step::Ignore,

            (St::ConnectionOpen, In::PeerJoined) if self.role.is_offerer() => {
                Step::advance(St::OfferSent, [Effect::CreateOffer])
            }
            (St::ConnectionOpen | St::OfferSent | St::OfferApplied | St::Connected, In::PeerJoined) => {
                Step::Ignore
            }

            (St::OfferSent, In::LocalOfferReady(offer))
                if self.role.is_offerer() && offer.kind == SdpType::Offer =>
            {
                let message = SignalingMessage::offer(offer.clone(), self.local.clone());
                Step::advance(St::OfferSent, [Effect::Publish(message)])
            }

            (St::ConnectionOpen, In::OfferReceived(payload))
                if !self.role.is_offerer() && payload.offer.kind == SdpType::Offer =>
            {
                Step::advance(St::OfferApplied, [Effect::CreateAnswer(payload.offer.clone())])
            }

            (St::OfferApplied, In::LocalAnswerReady(answer))
                if !self.role.is_offerer() && answer.kind == SdpType::Answer =>
            {
                let message = SignalingMessage::answer(answer.clone(), self.local.clone());
                Step::advance(St::Connected, [Effect::Publish(message)])
            }

            (St::OfferSent, In::AnswerReceived(payload))
                if self.role.is_offerer() && payload.answer.kind == SdpType::Answer =>
            {
                Step::advance(St::Connected, [Effect::ApplyAnswer(payload.answer.clone())])
            }

            _ => return Err(stale()),
        };

        Ok(step)
    }
}
