#![allow(dead_code)]

use draft_core::{
    ActorId, ChannelBroadcast, DraftCollaborators, DraftItem, DraftOrchestrator, DraftSettings,
    DraftVariant, FactionRegistry, NoticeReceiver, SliceGenerator, FACTION_CATEGORY,
    SEAT_CATEGORY, SLICE_CATEGORY,
};

pub fn actors(players: u32) -> Vec<ActorId> {
    (0..players).map(|index| ActorId(100 + index)).collect()
}

pub fn open_draft(
    variant: DraftVariant,
    players: u32,
    seed: u64,
) -> (DraftOrchestrator, NoticeReceiver) {
    let generator = SliceGenerator::builtin();
    let (broadcast, notices) = ChannelBroadcast::channel();
    let collaborators = DraftCollaborators::new(
        generator.catalog().clone(),
        FactionRegistry::builtin(),
        Box::new(broadcast),
    );
    let settings = DraftSettings::new(variant, actors(players)).with_seed(seed);
    let draft =
        DraftOrchestrator::generate(settings, &generator, collaborators).expect("open draft");
    (draft, notices)
}

/// Actor `i` takes seat `i`, slice `i` and the `i`-th pooled faction.
pub fn claim_diagonal(draft: &mut DraftOrchestrator) {
    let factions: Vec<String> = draft.factions().iter().map(|f| f.name.clone()).collect();
    for (index, actor) in draft.settings().actors.clone().into_iter().enumerate() {
        draft
            .claim(actor, SEAT_CATEGORY, DraftItem::Seat(index))
            .expect("seat");
        draft
            .claim(actor, SLICE_CATEGORY, DraftItem::Slice(index))
            .expect("slice");
        draft
            .claim(actor, FACTION_CATEGORY, DraftItem::Faction(factions[index].clone()))
            .expect("faction");
    }
}
