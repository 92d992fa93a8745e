use std::path::PathBuf;

use montage_project_model::{ContainerType, ProgramId};
use proptest::prelude::*;

fn container_type() -> impl Strategy<Value = ContainerType> {
    prop_oneof![
        Just(ContainerType::ScriptGenerator),
        Just(ContainerType::FilterScript),
        Just(ContainerType::ProjectXml),
    ]
}

proptest! {
    #[test]
    fn program_id_is_deterministic(
        uid in "[0-9a-f-]{8,36}",
        kind in container_type(),
        program in "/[a-z]{1,12}/[a-z]{1,12}\\.(py|gmic|xml)",
        media in "/[a-z]{1,12}/[a-z]{1,12}\\.(mp4|png)",
    ) {
        let program = PathBuf::from(program);
        let media = PathBuf::from(media);
        let a = ProgramId::derive(&uid, kind, &program, &media);
        let b = ProgramId::derive(&uid, kind, &program, &media);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn program_id_differs_per_uid(
        uid_a in "[0-9a-f]{32}",
        uid_b in "[0-9a-f]{32}",
        kind in container_type(),
    ) {
        prop_assume!(uid_a != uid_b);
        let program = PathBuf::from("/scripts/gen.py");
        let media = PathBuf::from("/media/unrendered.mp4");
        prop_assert_ne!(
            ProgramId::derive(&uid_a, kind, &program, &media),
            ProgramId::derive(&uid_b, kind, &program, &media)
        );
    }
}
