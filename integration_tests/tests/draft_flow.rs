use draft_core::{
    ActorId, DraftError, DraftItem, DraftPhase, DraftVariant, NoticeLevel, SLICE_CATEGORY,
};

mod common;

#[test]
fn linear_six_player_draft_commits() {
    let (mut draft, notices) = common::open_draft(DraftVariant::Linear, 6, 2024);
    assert_eq!(draft.slices().len(), 7);
    assert!(draft.ring().is_empty());
    assert_eq!(draft.factions().len(), 7);

    common::claim_diagonal(&mut draft);
    let outcome = draft.commit().expect("commit");

    assert_eq!(draft.phase(), DraftPhase::Committed);
    assert_eq!(outcome.turn_order, common::actors(6));
    assert_eq!(outcome.seats.len(), 6);
    assert_eq!(outcome.map_tiles.len(), 6 * 5);
    for (seat, assignment) in outcome.seats.iter().enumerate() {
        assert_eq!(assignment.seat, seat);
        assert_eq!(assignment.slice_index, seat);
    }
    let last = notices.try_iter().last().expect("summary notice");
    assert_eq!(last.level, NoticeLevel::Info);
    assert!(last.message.starts_with("draft committed"));
}

#[test]
fn equidistant_outcome_places_ring_before_slices() {
    let (mut draft, _) = common::open_draft(DraftVariant::Equidistant, 4, 5);
    let ring = draft.ring().to_vec();
    assert!(!ring.is_empty());
    common::claim_diagonal(&mut draft);
    let outcome = draft.commit().expect("commit");
    assert_eq!(&outcome.map_tiles[..ring.len()], ring.as_slice());
}

#[test]
fn contested_slice_blocks_commit_until_moved() {
    let (mut draft, _) = common::open_draft(DraftVariant::Linear, 3, 8);
    common::claim_diagonal(&mut draft);
    let second = common::actors(3)[1];
    draft
        .claim(second, SLICE_CATEGORY, DraftItem::Slice(0))
        .expect("contest");
    assert!(matches!(draft.commit(), Err(DraftError::Collision { .. })));
    assert_eq!(draft.phase(), DraftPhase::Selecting);

    draft
        .claim(second, SLICE_CATEGORY, DraftItem::Slice(3))
        .expect("move away");
    assert!(draft.commit().is_ok());
}

#[test]
fn cancelled_draft_refuses_claims() {
    let (mut draft, _) = common::open_draft(DraftVariant::Bunker, 3, 12);
    draft.cancel();
    assert_eq!(draft.phase(), DraftPhase::Cancelled);
    assert!(matches!(
        draft.claim(ActorId(100), SLICE_CATEGORY, DraftItem::Slice(0)),
        Err(DraftError::NotActive(DraftPhase::Cancelled))
    ));
}
