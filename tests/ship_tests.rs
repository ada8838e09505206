use naval_p2p::{Cell, Orientation, Placement, PlacementError, ShipType, SHIPS};

#[test]
fn catalog_lengths() {
    let lengths: Vec<usize> = SHIPS.iter().map(ShipType::length).collect();
    assert_eq!(lengths, vec![5, 4, 3, 2]);
    assert!(SHIPS.iter().all(|s| !s.name().is_empty()));
}

#[test]
fn orientation_parses_short_and_long_forms() {
    assert_eq!("h".parse::<Orientation>(), Ok(Orientation::Horizontal));
    assert_eq!("Vertical".parse::<Orientation>(), Ok(Orientation::Vertical));
    assert_eq!(
        "diagonal".parse::<Orientation>(),
        Err(PlacementError::UnknownOrientation("diagonal".into()))
    );
}

#[test]
fn placement_lays_out_along_orientation() {
    let submarine = SHIPS[2];
    let across = Placement::new(&submarine, Cell::new(7, 0), Orientation::Horizontal).unwrap();
    assert_eq!(across.cells().len(), 3);
    assert!(across.covers(Cell::new(9, 0)));
    assert!(!across.covers(Cell::new(7, 1)));

    let down = Placement::new(&submarine, Cell::new(0, 7), Orientation::Vertical).unwrap();
    assert!(down.covers(Cell::new(0, 9)));
    assert_eq!(down.origin(), Cell::new(0, 7));
}

#[test]
fn placement_off_the_grid_is_rejected() {
    let carrier = SHIPS[0];
    let err = Placement::new(&carrier, Cell::new(6, 0), Orientation::Horizontal).unwrap_err();
    assert!(matches!(err, PlacementError::OutOfBounds { ship: "carrier", .. }));
    assert!(Placement::new(&carrier, Cell::new(0, usize::MAX), Orientation::Vertical).is_err());
}
