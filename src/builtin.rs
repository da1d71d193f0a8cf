use crate::provider::{Matching, ProviderDefinition, ResolutionMode, StructuralClaim, SupportedMode};
use crate::resolver::UrlBuilder;
use lazy_static::lazy_static;
use regex::Regex;

// ECMAScript semantics: digits are ASCII only and `.` excludes line terminators
lazy_static! {
    static ref URN_NBN_DE: Regex = Regex::new(
        r"^[U,u][R,r][N,n]:[N,n][B,b][N,n]:[D,d][E,e][a-z0-9()+,\-.:=@;$_!*'%/?#]+$"
    )
    .unwrap();
    static ref URN_NBN_DE_PART: Regex =
        Regex::new(r"^[U,u][R,r][N,n]:[N,n][B,b][N,n]:[D,d][E,e]").unwrap();

    static ref URN_NBN_FI: Regex = Regex::new(
        r"^[U,u][R,r][N,n]:[N,n][B,b][N,n]:[F,f][I,i][a-z0-9()+,\-.:=@;$_!*'%/?#]+$"
    )
    .unwrap();
    static ref URN_NBN_FI_PART: Regex =
        Regex::new(r"^[U,u][R,r][N,n]:[N,n][B,b][N,n]:[F,f][I,i]").unwrap();

    static ref ARK: Regex =
        Regex::new(r"^(a|A)(r|R)(k|K):(?:/[0-9]{5,9})+/[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*$").unwrap();

    static ref ARXIV: Regex = Regex::new(
        r"^(a|A)(r|R)(X|x)(i|I)(v|V):[0-9]{2}((9|0)[1-9]|1[0-2])\.[0-9]{4,5}(v[0-9]+)?$"
    )
    .unwrap();

    // Pre-2007 identifiers: archive[.subject-class]/YYMMNNN
    static ref ARXIV_OLD: Regex = Regex::new(
        r"^(a|A)(r|R)(X|x)(i|I)(v|V):(astro-ph|cond-mat|gr-qc|hep-ex|hep-lat|hep-ph|hep-th|math-ph|nlin|nucl-ex|nucl-th|physics|quant-ph|math|CoRR|q-bio|q-fin|stat|eess|econ)(\.[A-Z][A-Z])?/[0-9]{2}(0[1-9]|1[0-2])[0-9]+(v[0-9]+)?$"
    )
    .unwrap();
    static ref ARXIV_OLD_PART: Regex = Regex::new(r"^(a|A)(r|R)(X|x)(i|I)(v|V):[a-z]").unwrap();

    static ref SWH: Regex = Regex::new(
        r"^(s|S)(w|W)(h|H):[1-9]:(cnt|dir|rel|rev|snp):[0-9a-f]+(;(origin|visit|anchor|path|lines)=\S+)*$"
    )
    .unwrap();

    static ref DOI: Regex =
        Regex::new(r"^(d|D)(o|O)(i|I):10\.[0-9]+/[^\n\r\x{2028}\x{2029}]+$").unwrap();

    static ref ZENODO: Regex = Regex::new(
        r"^10[^\n\r\x{2028}\x{2029}]5281/zenodo[^\n\r\x{2028}\x{2029}]([0-9]{7})+$"
    )
    .unwrap();

    static ref EPIC: Regex = Regex::new(r"^21\.T?[0-9]+/[^\n\r\x{2028}\x{2029}]+$").unwrap();

    static ref EPIC_OLD: Regex = Regex::new(r"^[0-9]{5}/[^\n\r\x{2028}\x{2029}]+$").unwrap();
    static ref EPIC_OLD_PART: Regex = Regex::new(r"^[0-9]").unwrap();
}

const HANDLE_PROXY: &str = "https://hdl.handle.net/";
const DOI_PROXY: &str = "https://doi.org/";
const SWH_ARCHIVE: &str = "https://archive.softwareheritage.org";

fn modes(supported: &[ResolutionMode]) -> Vec<SupportedMode> {
    supported.iter().copied().map(SupportedMode::new).collect()
}

fn prefixed(
    pid_type: &str,
    name: &str,
    pattern: &Regex,
    example: &str,
    supported: &[ResolutionMode],
) -> ProviderDefinition {
    let mut def = ProviderDefinition::new(pid_type, name);
    def.patterns = vec![pattern.clone()];
    def.example = Some(example.to_string());
    def.modes = modes(supported);
    def
}

/// The builtin provider definitions, in priority order.
///
/// Structural candidates are tried in the order they appear here: Zenodo
/// DOIs, then EPIC `21.` handles, then legacy 5-digit handles.
pub fn definitions() -> Vec<ProviderDefinition> {
    use ResolutionMode::{LandingPage, Metadata, Resource};

    let mut urn = ProviderDefinition::new("urn", "URN");
    urn.matching = Matching::Umbrella {
        sub_schemes: vec!["urn:nbn:de".to_string(), "urn:nbn:fi".to_string()],
    };

    let mut urn_nbn_de = prefixed(
        "urn:nbn:de",
        "URN:NBN Germany",
        &URN_NBN_DE,
        "urn:nbn:de:hbz:6-85659524771",
        &[LandingPage, Metadata, Resource],
    );
    urn_nbn_de.prefilter = Some(URN_NBN_DE_PART.clone());

    let mut urn_nbn_fi = prefixed(
        "urn:nbn:fi",
        "URN:NBN Finland",
        &URN_NBN_FI,
        "urn:nbn:fi-fe2021080942632",
        &[LandingPage],
    );
    urn_nbn_fi.prefilter = Some(URN_NBN_FI_PART.clone());

    let ark = prefixed(
        "ark",
        "ARK",
        &ARK,
        "ark:/13030/tf5p30086k",
        &[LandingPage, Metadata],
    );

    let mut arxiv = prefixed(
        "arxiv",
        "arXiv",
        &ARXIV,
        "arxiv:1512.00135",
        &[LandingPage, Metadata, Resource],
    );
    arxiv.fallback = Some("arxiv.old".to_string());

    let mut arxiv_old = prefixed(
        "arxiv.old",
        "arXiv (legacy)",
        &ARXIV_OLD,
        "arXiv:math.RT/0309136",
        &[LandingPage, Metadata, Resource],
    );
    arxiv_old.prefilter = Some(ARXIV_OLD_PART.clone());

    let mut swh = prefixed(
        "swh",
        "Software Heritage",
        &SWH,
        "swh:1:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2",
        &[LandingPage, Metadata, Resource],
    );
    swh.builder = UrlBuilder::DirectApiHost {
        landing: Some(format!("{}/{{pid}}", SWH_ARCHIVE)),
        metadata: Some(format!("{}/api/1/resolve/{{pid}}/", SWH_ARCHIVE)),
        resource: None,
    };

    let mut doi = prefixed(
        "doi",
        "DOI",
        &DOI,
        "doi:10.3352/jeehp.2013.10.3",
        &[LandingPage],
    );
    doi.builder = UrlBuilder::StripPrefix {
        len: 4,
        base: DOI_PROXY.to_string(),
    };
    doi.relies_on_dois = true;

    let mut zenodo = prefixed(
        "zenodo",
        "Zenodo",
        &ZENODO,
        "10.5281/zenodo.8056361",
        &[LandingPage, Metadata, Resource],
    );
    zenodo.matching = Matching::Structural(StructuralClaim::Literal("10.5281".to_string()));
    zenodo.relies_on_dois = true;

    let mut epic = prefixed(
        "epic",
        "EPIC Handle",
        &EPIC,
        "21.T11148/f5e68cc7718a6af2a96c",
        &[LandingPage, Metadata],
    );
    epic.matching = Matching::Structural(StructuralClaim::Literal("21.".to_string()));
    epic.builder = UrlBuilder::PassThrough {
        base: HANDLE_PROXY.to_string(),
    };

    let mut epic_old = prefixed(
        "epic.old",
        "EPIC Handle (legacy)",
        &EPIC_OLD,
        "11500/ATHENA-0000-0000-2401-6",
        &[LandingPage, Metadata],
    );
    epic_old.prefilter = Some(EPIC_OLD_PART.clone());
    epic_old.matching = Matching::Structural(StructuralClaim::Prefilter);
    epic_old.builder = UrlBuilder::PassThrough {
        base: HANDLE_PROXY.to_string(),
    };

    vec![
        urn, urn_nbn_de, urn_nbn_fi, ark, arxiv, arxiv_old, swh, doi, zenodo, epic, epic_old,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_match_their_own_patterns() {
        for def in definitions().iter().filter(|d| !d.is_umbrella()) {
            let example = def.example.as_deref().unwrap();
            assert!(def.is_match(example), "{} rejects its example", def.pid_type);
            assert!(
                def.prefilter_matches(example),
                "{} prefilter rejects its example",
                def.pid_type
            );
        }
    }

    #[test]
    fn test_ark_accepts_mixed_case_tag() {
        assert!(ARK.is_match("ARK:/13030/tf5p30086k"));
        assert!(ARK.is_match("Ark:/13030/tf5p30086k"));
        assert!(!ARK.is_match("ark:13030/tf5p30086k"));
    }

    #[test]
    fn test_arxiv_month_range() {
        assert!(ARXIV.is_match("arXiv:0704.0001"));
        assert!(ARXIV.is_match("ARXIV:2312.12345v2"));
        assert!(!ARXIV.is_match("arxiv:2313.12345"));
        assert!(!ARXIV.is_match("arxiv:2300.12345"));
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        let defs = definitions();
        let find = |t: &str| defs.iter().find(|d| d.pid_type == t).cloned().unwrap();

        assert!(!find("epic.old").is_match("\u{661}\u{661}\u{665}\u{660}\u{660}/ATHENA"));
        assert!(!find("epic.old").prefilter_matches("\u{661}1500/ATHENA"));
        assert!(!find("ark").is_match("ark:/\u{661}\u{663}\u{660}\u{663}\u{660}/tf5p30086k"));
        assert!(!find("doi").is_match("doi:10.\u{663}\u{663}\u{665}\u{662}/x"));
        assert!(!find("epic").is_match("21.T\u{661}\u{661}\u{661}\u{664}\u{668}/abc"));
        assert!(!find("arxiv").is_match("arxiv:\u{661}512.00135"));
    }

    #[test]
    fn test_line_terminators_are_rejected() {
        assert!(!DOI.is_match("doi:10.1/a\rb"));
        assert!(!DOI.is_match("doi:10.1/a\u{2028}b"));
        assert!(!EPIC.is_match("21.T11148/x\ry"));
        assert!(!EPIC_OLD.is_match("11500/a\nb"));
        assert!(!ZENODO.is_match("10\r5281/zenodo.8056361"));
        assert!(DOI.is_match("doi:10.1/a b"));
    }

    #[test]
    fn test_swh_qualifiers() {
        assert!(SWH.is_match(
            "swh:1:dir:d198bc9d7a6bcf6db04f476d29314f157507d505;origin=https://github.com/example/repo"
        ));
        assert!(!SWH.is_match("swh:0:cnt:94a9ed024d3859793618152ea559a168bbcbb5e2"));
    }
}
