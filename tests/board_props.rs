use naval_p2p::{BoardModel, Cell, Orientation, GRID_SIZE, SHIPS};
use proptest::prelude::*;

fn orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Horizontal), Just(Orientation::Vertical)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn valid_placement_occupies_ship_length(
        ship in 0..SHIPS.len(),
        col in 0..GRID_SIZE,
        row in 0..GRID_SIZE,
        orient in orientation(),
    ) {
        let ship = SHIPS[ship];
        let fits = match orient {
            Orientation::Horizontal => col + ship.length() <= GRID_SIZE,
            Orientation::Vertical => row + ship.length() <= GRID_SIZE,
        };
        let mut board = BoardModel::new();
        let result = board.place(ship.id(), Cell::new(col, row), orient);
        prop_assert_eq!(result.is_ok(), fits);
        if fits {
            prop_assert_eq!(board.occupied().len(), ship.length());
            let placed = board.placement(ship.id()).unwrap();
            prop_assert!(placed.cells().iter().all(|c| c.in_bounds(GRID_SIZE)));
        }
    }

    #[test]
    fn failed_placement_never_mutates(
        seed in any::<u64>(),
        ship in 0..SHIPS.len(),
        col in 0..GRID_SIZE * 2,
        row in 0..GRID_SIZE * 2,
        orient in orientation(),
    ) {
        let mut board = BoardModel::new();
        board.randomize(Some(seed)).unwrap();
        let before = board.snapshot();
        if board.place(SHIPS[ship].id(), Cell::new(col, row), orient).is_err() {
            prop_assert_eq!(board.snapshot(), before);
        }
    }

    #[test]
    fn randomize_yields_conflict_free_fleet(seed in any::<u64>()) {
        let mut board = BoardModel::new();
        board.randomize(Some(seed)).unwrap();
        prop_assert!(board.is_fully_placed());
        let total: usize = board.placements().map(|p| p.cells().len()).sum();
        prop_assert_eq!(board.occupied().len(), total);
    }
}
