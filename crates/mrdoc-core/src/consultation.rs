//! One user's conversation with the assistant
//!
//! `Consultation` is the session-scoped context handed to every input handler.
//! It owns the transcript and the awaiting-image flag, routes each line of input,
//! and turns uploads into a [`Diagnosis`].

use crate::diseases::Diagnosis;
use crate::error::{DoctorError, Result};
use crate::intent::{classify_intent, Intent};
use crate::responder::{PendingReply, Responder};
use crate::session::{ImagePolicy, Session};
use crate::state::ChatTurn;
use crate::vision::{ImageClassifier, UploadedImage};

/// Prompt shown when the user asks to send an image
pub const UPLOAD_PROMPT: &str = "You can now upload an image for identification.";

/// What the front end should do with a submitted line
pub enum Dispatch {
    /// Send this prompt and pass the reply to [`Consultation::finish_turn`]
    Respond(PendingReply),
    /// Show the upload control; no reply is expected
    AwaitImage,
}

/// Result of a complete text turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied(String),
    ImageRequested,
}

pub struct Consultation {
    session: Session,
    responder: Responder,
    image_policy: ImagePolicy,
}

impl Consultation {
    pub fn new(responder: Responder, image_policy: ImagePolicy) -> Self {
        Self {
            session: Session::new(),
            responder,
            image_policy,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    pub fn responder_mut(&mut self) -> &mut Responder {
        &mut self.responder
    }

    /// Record the user's line and decide how to answer it.
    ///
    /// The prompt is rendered from the turns that came before this question.
    pub fn begin_turn(&mut self, question: &str) -> Dispatch {
        let intent = classify_intent(question);
        tracing::debug!(?intent, "routing user input");

        let dispatch = match intent {
            Intent::ImageRequest => {
                self.session.set_awaiting_image(true);
                Dispatch::AwaitImage
            }
            Intent::TextQuery => {
                Dispatch::Respond(self.responder.prepare(question, self.session.turns()))
            }
        };

        self.session.append(ChatTurn::human(question));
        dispatch
    }

    /// Append the assistant's reply for the turn started by [`begin_turn`](Self::begin_turn)
    pub fn finish_turn(&mut self, reply: String) {
        self.session.append(ChatTurn::assistant(reply));
    }

    /// Run a whole text turn, waiting for the reply.
    /// On failure the user's turn stays in the transcript and no reply is added.
    pub async fn submit(&mut self, question: &str) -> Result<TurnOutcome> {
        match self.begin_turn(question) {
            Dispatch::AwaitImage => Ok(TurnOutcome::ImageRequested),
            Dispatch::Respond(pending) => {
                let reply = pending.resolve().await?;
                self.finish_turn(reply.clone());
                Ok(TurnOutcome::Replied(reply))
            }
        }
    }

    /// Classify an uploaded image and resolve it through the disease table.
    /// The result is returned for display and never added to the transcript.
    pub fn examine(
        &mut self,
        classifier: &mut dyn ImageClassifier,
        upload: &UploadedImage,
    ) -> Result<Diagnosis> {
        if !self.session.awaiting_image() {
            return Err(DoctorError::ImageNotRequested);
        }

        let result = classifier.classify(upload.image());

        if self.image_policy == ImagePolicy::SingleShot {
            self.session.set_awaiting_image(false);
        }

        let class_index = result?;
        let diagnosis = Diagnosis::from_class(class_index);
        tracing::info!(image = upload.name(), class_index, "image examined");
        Ok(diagnosis)
    }
}
