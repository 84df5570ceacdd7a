//! Reducer calls the client makes, registered so their outcomes come back as
//! Bevy messages.

use crate::module_bindings::{PlacementRow, Reducer};
use bevy::prelude::*;
use bevy_spacetimedb::{ReadReducerMessage, RegisterReducerMessage};
use spacetimedb_sdk::{ReducerEvent, Status};

#[derive(Debug, RegisterReducerMessage)]
pub struct SetCharacter {
    pub event: ReducerEvent<Reducer>,
    pub id: String,
    pub name: String,
    pub email: String,
    pub position: String,
    pub rotation: String,
    pub animation: Vec<String>,
    pub place: String,
}

#[derive(Debug, RegisterReducerMessage)]
pub struct UpdateCharacter {
    pub event: ReducerEvent<Reducer>,
    pub id: String,
    pub position: String,
    pub rotation: String,
    pub animation: Vec<String>,
    pub place: String,
    pub service: String,
}

#[derive(Debug, RegisterReducerMessage)]
pub struct DeleteCharacter {
    pub event: ReducerEvent<Reducer>,
    pub id: String,
}

#[derive(Debug, RegisterReducerMessage)]
pub struct SaveFinca {
    pub event: ReducerEvent<Reducer>,
    pub id: String,
    pub name: String,
    pub arquitectura: Vec<PlacementRow>,
}

fn rejection(event: &ReducerEvent<Reducer>) -> Option<&str> {
    match &event.status {
        Status::Committed => None,
        Status::Failed(reason) => Some(reason),
        _ => Some("out of energy"),
    }
}

/// Logs reducer calls the module refused.
///
/// A refused `update_character` needs no action here: the next presence
/// write finds the row missing and recreates it.
pub(super) fn log_rejections(
    mut set: ReadReducerMessage<SetCharacter>,
    mut update: ReadReducerMessage<UpdateCharacter>,
    mut delete: ReadReducerMessage<DeleteCharacter>,
    mut finca: ReadReducerMessage<SaveFinca>,
) {
    for message in set.read() {
        if let Some(reason) = rejection(&message.result.event) {
            warn!("set_character {} refused: {reason}", message.result.id);
        }
    }
    for message in update.read() {
        if let Some(reason) = rejection(&message.result.event) {
            debug!("update_character {} refused: {reason}", message.result.id);
        }
    }
    for message in delete.read() {
        if let Some(reason) = rejection(&message.result.event) {
            debug!("delete_character {} refused: {reason}", message.result.id);
        }
    }
    for message in finca.read() {
        match rejection(&message.result.event) {
            Some(reason) => warn!("save_finca {} refused: {reason}", message.result.id),
            None => info!("finca {} saved", message.result.name),
        }
    }
}
